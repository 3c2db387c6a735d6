// src/session/mod.rs
//! Monitoring sessions: drive a sample source through the gap tracker

pub mod monitor;

pub use monitor::{EndReason, MonitorSession, SessionReport};

use crate::config::constants::session;
use serde::{Deserialize, Serialize};

/// Session limits and reporting cadence
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Stop after `sample_rate_hz * run_time_secs` samples
    #[serde(default)]
    pub run_time_secs: Option<u64>,

    #[serde(default)]
    pub max_samples: Option<u64>,

    /// 0 disables periodic summaries
    #[serde(default = "defaults::summary_interval_samples")]
    pub summary_interval_samples: u64,

    /// Decode radio ack and hold counters from the aux bytes
    #[serde(default)]
    pub track_link_diagnostics: bool,
}

mod defaults {
    use super::session;

    pub fn sample_rate_hz() -> u32 { session::DEFAULT_SAMPLE_RATE_HZ }
    pub fn summary_interval_samples() -> u64 { session::DEFAULT_SUMMARY_INTERVAL_SAMPLES }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            run_time_secs: None,
            max_samples: None,
            summary_interval_samples: defaults::summary_interval_samples(),
            track_link_diagnostics: false,
        }
    }
}

impl SessionConfig {
    /// Effective sample cap, the tighter of `max_samples` and the run time
    pub fn sample_limit(&self) -> Option<u64> {
        let from_run_time = self
            .run_time_secs
            .map(|secs| secs.saturating_mul(u64::from(self.sample_rate_hz)));

        match (self.max_samples, from_run_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let rates = session::MIN_SAMPLE_RATE_HZ..=session::MAX_SAMPLE_RATE_HZ;
        if !rates.contains(&self.sample_rate_hz) {
            return Err(format!(
                "sample_rate_hz must be between {} and {}, got {}",
                session::MIN_SAMPLE_RATE_HZ,
                session::MAX_SAMPLE_RATE_HZ,
                self.sample_rate_hz
            ));
        }
        if self.run_time_secs == Some(0) {
            return Err("run_time_secs must be positive when set".to_string());
        }
        Ok(())
    }
}
