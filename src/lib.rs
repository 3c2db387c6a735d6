//! BCI link monitor: sample-sequence gap detection for streaming biosignal boards
//!
//! Streaming boards stamp every sample with a wrapping 0-255 counter. This
//! library watches that counter to measure link quality:
//!
//! - Sequence gap tracking with abort-on-threshold
//! - Sample sources for simulated boards, recorded byte streams and threads
//! - Session controller that stops the board once the link is deemed bad
//! - Text, CSV and JSON lines reporting
//! - Layered TOML configuration with environment overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bci_link_monitor::hal::{SimulatedBoard, SimulatorConfig};
//! use bci_link_monitor::report::TextReport;
//! use bci_link_monitor::session::{MonitorSession, SessionConfig};
//! use bci_link_monitor::tracking::TrackerConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let board = SimulatedBoard::new(SimulatorConfig {
//!         total_samples: Some(3000),
//!         drop_probability: 0.001,
//!         ..Default::default()
//!     })?;
//!
//!     let tracker = TrackerConfig::default();
//!     let mut session = MonitorSession::new(board, &tracker, SessionConfig::default())?
//!         .with_sink(Box::new(TextReport::new(std::io::stdout())));
//!
//!     let report = session.run()?;
//!     println!("{} bad of {}", report.summary.bad_count, report.summary.total_count);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod hal;
pub mod report;
pub mod session;
pub mod tracking;
pub mod utils;

// Re-export commonly used types for convenience
pub use error::{ErrorContext, MonitorError, MonitorResult};

pub use hal::{SampleRecord, SampleSource, SourceError, SourceInfo};

pub use session::{EndReason, MonitorSession, SessionConfig, SessionReport};

pub use tracking::{
    Classification, Outcome, SequenceGap, SequenceGapTracker, SharedTracker, ThresholdMode,
    TrackerConfig, TrackerError, TrackerSummary,
};

pub use utils::time::{current_timestamp_nanos, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Sample-sequence gap detection for streaming biosignal boards".to_string(),
        features: vec![
            "Wrapping sequence gap tracking".to_string(),
            "Abort on bad packet threshold".to_string(),
            "Simulated, replayed and threaded sample sources".to_string(),
            "Text, CSV and JSON lines reports".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
