// src/error.rs
//! Crate-level error type
//!
//! Component errors (tracker, sources, sinks, configuration) keep their own
//! enums. When they cross a session or CLI boundary they are wrapped in
//! [`MonitorError`] together with an [`ErrorContext`] recording where and
//! when the failure surfaced.

use crate::config::loader::ConfigError;
use crate::hal::SourceError;
use crate::report::ReportError;
use crate::tracking::TrackerError;
use serde::Serialize;
use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::Error;

/// Unified error type for monitoring sessions
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("[TRACKER] {source} ({})", .context.operation)]
    Tracker {
        #[source]
        source: TrackerError,
        context: ErrorContext,
    },

    #[error("[SOURCE] {source} ({}:{})", .context.component, .context.operation)]
    Source {
        #[source]
        source: SourceError,
        context: ErrorContext,
    },

    #[error("[REPORT] {source} ({})", .context.operation)]
    Report {
        #[source]
        source: ReportError,
        context: ErrorContext,
    },

    #[error("[CONFIG] {source}")]
    Configuration {
        #[source]
        source: ConfigError,
        context: ErrorContext,
    },

    #[error("[SESSION] invalid session: {reason}")]
    Session { reason: String, context: ErrorContext },
}

impl MonitorError {
    pub fn from_source(source: SourceError, context: ErrorContext) -> Self {
        MonitorError::Source { source, context }
    }

    pub fn from_report(source: ReportError, context: ErrorContext) -> Self {
        MonitorError::Report { source, context }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            MonitorError::Tracker { context, .. }
            | MonitorError::Source { context, .. }
            | MonitorError::Report { context, .. }
            | MonitorError::Configuration { context, .. }
            | MonitorError::Session { context, .. } => context,
        }
    }
}

/// Error context for debugging and analysis
#[derive(Debug, Clone, Serialize)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub thread_id: Option<String>,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub additional_info: HashMap<String, String>,
}

impl ErrorContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            thread_id: std::thread::current().name().map(|s| s.to_string()),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
            additional_info: HashMap::new(),
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }

    pub fn add_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl From<TrackerError> for MonitorError {
    fn from(source: TrackerError) -> Self {
        MonitorError::Tracker {
            source,
            context: error_context!("tracker", "observe"),
        }
    }
}

impl From<SourceError> for MonitorError {
    fn from(source: SourceError) -> Self {
        MonitorError::Source {
            source,
            context: error_context!("source", "sample_source"),
        }
    }
}

impl From<ReportError> for MonitorError {
    fn from(source: ReportError) -> Self {
        MonitorError::Report {
            source,
            context: error_context!("report", "sink"),
        }
    }
}

impl From<ConfigError> for MonitorError {
    fn from(source: ConfigError) -> Self {
        MonitorError::Configuration {
            source,
            context: error_context!("config", "load"),
        }
    }
}

/// Result type alias for monitoring operations
pub type MonitorResult<T> = Result<T, MonitorError>;
