// src/report/json.rs
//! JSON lines event log

use crate::hal::SourceInfo;
use crate::report::{ReportError, ReportSink};
use crate::session::SessionReport;
use crate::tracking::{AuxEvent, SequenceGap, TrackerSummary};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ReportEvent<'a> {
    SessionStarted {
        timestamp_ms: u64,
        source: &'a SourceInfo,
    },
    Mismatch {
        timestamp_ms: u64,
        expected: u8,
        received: u8,
    },
    Link {
        timestamp_ms: u64,
        link: &'a AuxEvent,
    },
    Summary {
        timestamp_ms: u64,
        #[serde(flatten)]
        summary: &'a TrackerSummary,
    },
    SessionFinished {
        #[serde(flatten)]
        report: &'a SessionReport,
    },
}

/// Writes one JSON object per line
pub struct JsonLinesReport<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, event: &ReportEvent<'_>) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write + Send> ReportSink for JsonLinesReport<W> {
    fn session_started(&mut self, source: &SourceInfo, at_ms: u64) -> Result<(), ReportError> {
        self.emit(&ReportEvent::SessionStarted {
            timestamp_ms: at_ms,
            source,
        })
    }

    fn mismatch(&mut self, gap: &SequenceGap, at_ms: u64) -> Result<(), ReportError> {
        self.emit(&ReportEvent::Mismatch {
            timestamp_ms: at_ms,
            expected: gap.expected,
            received: gap.received,
        })
    }

    fn link_event(&mut self, event: &AuxEvent, at_ms: u64) -> Result<(), ReportError> {
        self.emit(&ReportEvent::Link {
            timestamp_ms: at_ms,
            link: event,
        })
    }

    fn summary(&mut self, summary: &TrackerSummary, at_ms: u64) -> Result<(), ReportError> {
        self.emit(&ReportEvent::Summary {
            timestamp_ms: at_ms,
            summary,
        })
    }

    fn session_finished(&mut self, report: &SessionReport) -> Result<(), ReportError> {
        self.emit(&ReportEvent::SessionFinished { report })?;
        self.writer.flush()?;
        Ok(())
    }
}
