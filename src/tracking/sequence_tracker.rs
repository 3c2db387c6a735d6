// src/tracking/sequence_tracker.rs
//! Wrapping sample sequence gap detection with an abort-on-threshold policy
//!
//! Boards stamp every sample with an 8-bit counter that wraps from 255 back to
//! 0. The tracker compares each arriving counter value with the one it expects
//! next, tallies in-order and out-of-order arrivals, and latches into an
//! aborted state once the out-of-order count crosses the configured threshold.
//!
//! After a mismatch the expected value is re-anchored to the index just seen,
//! so a single dropped sample costs exactly one bad classification.

use crate::config::constants::sequence::{
    DEFAULT_BAD_THRESHOLD, MAX_SAMPLE_INDEX, MIN_BAD_THRESHOLD, MIN_SAMPLE_INDEX,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the bad count is compared with the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Abort when `bad_count >= bad_threshold`
    #[default]
    Inclusive,
    /// Abort when `bad_count > bad_threshold`
    Strict,
}

impl ThresholdMode {
    fn is_crossed(self, bad_count: u64, threshold: u64) -> bool {
        match self {
            ThresholdMode::Inclusive => bad_count >= threshold,
            ThresholdMode::Strict => bad_count > threshold,
        }
    }
}

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "defaults::bad_threshold")]
    pub bad_threshold: u64,

    #[serde(default)]
    pub threshold_mode: ThresholdMode,
}

mod defaults {
    pub fn bad_threshold() -> u64 { super::DEFAULT_BAD_THRESHOLD }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bad_threshold: DEFAULT_BAD_THRESHOLD,
            threshold_mode: ThresholdMode::Inclusive,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.bad_threshold < MIN_BAD_THRESHOLD {
            return Err(TrackerError::InvalidThreshold(self.bad_threshold));
        }
        Ok(())
    }
}

/// Tracker errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("sample index {value} outside [0, 255]")]
    InvalidInput { value: i64 },

    #[error("bad packet threshold must be at least 1, got {0}")]
    InvalidThreshold(u64),
}

/// A single out-of-order arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceGap {
    pub expected: u8,
    pub received: u8,
}

impl SequenceGap {
    /// Number of samples skipped going forward from `expected` to `received`,
    /// modulo the counter width. Zero never occurs for a real gap.
    pub fn forward_distance(&self) -> u8 {
        self.received.wrapping_sub(self.expected)
    }
}

/// Classification of one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Classification {
    Good,
    Bad(SequenceGap),
    /// The tracker had already aborted; nothing was recorded
    Ignored,
}

/// Result of [`SequenceGapTracker::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub classification: Classification,
    /// Tracker state after the call. True on the call that crossed the
    /// threshold and on every ignored call after it.
    pub aborted: bool,
}

impl Outcome {
    pub fn is_good(&self) -> bool {
        matches!(self.classification, Classification::Good)
    }

    pub fn is_bad(&self) -> bool {
        matches!(self.classification, Classification::Bad(_))
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.classification, Classification::Ignored)
    }

    pub fn gap(&self) -> Option<SequenceGap> {
        match self.classification {
            Classification::Bad(gap) => Some(gap),
            _ => None,
        }
    }
}

/// Read-only snapshot of the tracker counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackerSummary {
    pub total_count: u64,
    pub good_count: u64,
    pub bad_count: u64,
    pub aborted: bool,
}

impl TrackerSummary {
    /// Fraction of arrivals that were out of order, 0.0 when nothing arrived
    pub fn bad_ratio(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.bad_count as f64 / self.total_count as f64
        }
    }
}

/// Sequence gap detector for one monitoring session
#[derive(Debug, Clone)]
pub struct SequenceGapTracker {
    expected: u8,
    good_count: u64,
    bad_count: u64,
    total_count: u64,
    bad_threshold: u64,
    threshold_mode: ThresholdMode,
    aborted: bool,
    last_gap: Option<SequenceGap>,
}

impl SequenceGapTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;

        Ok(Self {
            expected: 0,
            good_count: 0,
            bad_count: 0,
            total_count: 0,
            bad_threshold: config.bad_threshold,
            threshold_mode: config.threshold_mode,
            aborted: false,
            last_gap: None,
        })
    }

    /// Inclusive-mode tracker with the given threshold
    pub fn with_threshold(bad_threshold: u64) -> Result<Self, TrackerError> {
        Self::new(&TrackerConfig {
            bad_threshold,
            threshold_mode: ThresholdMode::Inclusive,
        })
    }

    /// Record one arriving sample index.
    ///
    /// Indices outside `[0, 255]` are rejected without touching any counter.
    /// Once aborted, every valid call is ignored.
    pub fn observe(&mut self, sample_index: i64) -> Result<Outcome, TrackerError> {
        if !(MIN_SAMPLE_INDEX..=MAX_SAMPLE_INDEX).contains(&sample_index) {
            return Err(TrackerError::InvalidInput { value: sample_index });
        }
        let received = sample_index as u8;

        if self.aborted {
            return Ok(Outcome {
                classification: Classification::Ignored,
                aborted: true,
            });
        }

        self.total_count += 1;

        let classification = if received == self.expected {
            self.good_count += 1;
            self.expected = self.expected.wrapping_add(1);
            Classification::Good
        } else {
            let gap = SequenceGap {
                expected: self.expected,
                received,
            };
            self.bad_count += 1;
            self.expected = received.wrapping_add(1);
            self.last_gap = Some(gap);
            Classification::Bad(gap)
        };

        if self.threshold_mode.is_crossed(self.bad_count, self.bad_threshold) {
            self.aborted = true;
        }

        Ok(Outcome {
            classification,
            aborted: self.aborted,
        })
    }

    pub fn summary(&self) -> TrackerSummary {
        TrackerSummary {
            total_count: self.total_count,
            good_count: self.good_count,
            bad_count: self.bad_count,
            aborted: self.aborted,
        }
    }

    /// Next sample index the tracker anticipates
    pub fn expected(&self) -> u8 {
        self.expected
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn bad_threshold(&self) -> u64 {
        self.bad_threshold
    }

    pub fn threshold_mode(&self) -> ThresholdMode {
        self.threshold_mode
    }

    pub fn last_gap(&self) -> Option<SequenceGap> {
        self.last_gap
    }
}

impl Default for SequenceGapTracker {
    fn default() -> Self {
        Self {
            expected: 0,
            good_count: 0,
            bad_count: 0,
            total_count: 0,
            bad_threshold: DEFAULT_BAD_THRESHOLD,
            threshold_mode: ThresholdMode::Inclusive,
            aborted: false,
            last_gap: None,
        }
    }
}
