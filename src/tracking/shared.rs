// src/tracking/shared.rs
//! Mutex-serialized tracker handle for hosts with several producer threads

use crate::tracking::sequence_tracker::{
    Outcome, SequenceGapTracker, TrackerConfig, TrackerError, TrackerSummary,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to one tracker. Every call holds the lock for exactly one
/// observation, so concurrent producers see a single serial order.
#[derive(Debug, Clone)]
pub struct SharedTracker {
    inner: Arc<Mutex<SequenceGapTracker>>,
}

impl SharedTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        Ok(Self::from_tracker(SequenceGapTracker::new(config)?))
    }

    pub fn from_tracker(tracker: SequenceGapTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    pub fn observe(&self, sample_index: i64) -> Result<Outcome, TrackerError> {
        self.inner.lock().observe(sample_index)
    }

    pub fn summary(&self) -> TrackerSummary {
        self.inner.lock().summary()
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.lock().is_aborted()
    }

    /// Copy of the tracker state at this instant
    pub fn snapshot(&self) -> SequenceGapTracker {
        self.inner.lock().clone()
    }
}
