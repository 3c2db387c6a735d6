// src/report/mod.rs
//! Reporting sinks for session summaries and sequence mismatches

pub mod text;
pub mod csv;
pub mod json;

pub use self::csv::CsvReport;
pub use self::json::JsonLinesReport;
pub use self::text::TextReport;

use crate::hal::SourceInfo;
use crate::session::SessionReport;
use crate::tracking::{AuxEvent, SequenceGap, TrackerSummary};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Sink errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Consumer of session events. Only `summary` is mandatory.
pub trait ReportSink: Send {
    fn session_started(&mut self, _source: &SourceInfo, _at_ms: u64) -> Result<(), ReportError> {
        Ok(())
    }

    fn mismatch(&mut self, _gap: &SequenceGap, _at_ms: u64) -> Result<(), ReportError> {
        Ok(())
    }

    /// Radio link diagnostics, only sent when the session tracks them
    fn link_event(&mut self, _event: &AuxEvent, _at_ms: u64) -> Result<(), ReportError> {
        Ok(())
    }

    fn summary(&mut self, summary: &TrackerSummary, at_ms: u64) -> Result<(), ReportError>;

    fn session_finished(&mut self, _report: &SessionReport) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "csv" => Ok(ReportFormat::Csv),
            "json" | "jsonl" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format: {}", other)),
        }
    }
}

/// Build a sink of the given format writing to `writer`
pub fn sink_for(format: ReportFormat, writer: Box<dyn Write + Send>) -> Box<dyn ReportSink> {
    match format {
        ReportFormat::Text => Box::new(TextReport::new(writer)),
        ReportFormat::Csv => Box::new(CsvReport::new(writer)),
        ReportFormat::Json => Box::new(JsonLinesReport::new(writer)),
    }
}
