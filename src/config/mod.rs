// src/config/mod.rs
//! Monitor configuration

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::hal::SimulatorConfig;
use crate::report::ReportFormat;
use crate::session::SessionConfig;
use crate::tracking::{ThresholdMode, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Where and how session reports are written
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,

    /// Standard output when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl MonitorConfig {
    /// Validate every section and the agreement between them
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(err) = self.tracker.validate() {
            errors.push(format!("tracker: {}", err));
        }
        if let Err(err) = self.session.validate() {
            errors.push(format!("session: {}", err));
        }
        if let Err(err) = self.simulator.validate() {
            errors.push(format!("simulator: {}", err));
        }

        if self.simulator.sample_rate_hz != self.session.sample_rate_hz {
            errors.push(format!(
                "simulator sample rate ({} Hz) differs from session sample rate ({} Hz)",
                self.simulator.sample_rate_hz, self.session.sample_rate_hz
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        ConfigSummary {
            bad_threshold: self.tracker.bad_threshold,
            threshold_mode: self.tracker.threshold_mode,
            sample_rate_hz: self.session.sample_rate_hz,
            sample_limit: self.session.sample_limit(),
            summary_interval_samples: self.session.summary_interval_samples,
            format: self.report.format,
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub bad_threshold: u64,
    pub threshold_mode: ThresholdMode,
    pub sample_rate_hz: u32,
    pub sample_limit: Option<u64>,
    pub summary_interval_samples: u64,
    pub format: ReportFormat,
}
