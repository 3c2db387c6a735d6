// src/utils/time.rs
//! Clock access behind a trait so sessions and sources can run on mock time

use crate::config::constants::time::{NANOSECONDS_PER_MILLISECOND, NANOSECONDS_PER_SECOND};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;

    fn now_millis(&self) -> u64 {
        self.now_nanos() / NANOSECONDS_PER_MILLISECOND
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_nanos(&self) -> u64 {
        current_timestamp_nanos()
    }
}

/// Manually advanced clock for deterministic tests. Clones share one clock.
#[derive(Debug, Clone)]
pub struct MockTimeProvider {
    current_time: Arc<AtomicU64>,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: Arc::new(AtomicU64::new(initial_time_nanos)),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }
}

pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

pub fn current_timestamp_millis() -> u64 {
    current_timestamp_nanos() / NANOSECONDS_PER_MILLISECOND
}

/// Nominal spacing between samples; zero rate yields zero
pub fn sample_period_nanos(sample_rate_hz: u32) -> u64 {
    if sample_rate_hz == 0 {
        0
    } else {
        NANOSECONDS_PER_SECOND / u64::from(sample_rate_hz)
    }
}
