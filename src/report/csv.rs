// src/report/csv.rs
//! One CSV row per summary snapshot

use crate::report::{ReportError, ReportSink};
use crate::session::SessionReport;
use crate::tracking::TrackerSummary;
use std::io::Write;

const HEADER: &str = "timestamp_ms,total,good,bad,aborted";

pub struct CsvReport<W> {
    writer: W,
    header_written: bool,
}

impl<W: Write + Send> CsvReport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_row(&mut self, summary: &TrackerSummary, at_ms: u64) -> Result<(), ReportError> {
        if !self.header_written {
            writeln!(self.writer, "{}", HEADER)?;
            self.header_written = true;
        }
        writeln!(
            self.writer,
            "{},{},{},{},{}",
            at_ms, summary.total_count, summary.good_count, summary.bad_count, summary.aborted
        )?;
        Ok(())
    }
}

impl<W: Write + Send> ReportSink for CsvReport<W> {
    fn summary(&mut self, summary: &TrackerSummary, at_ms: u64) -> Result<(), ReportError> {
        self.write_row(summary, at_ms)
    }

    fn session_finished(&mut self, _report: &SessionReport) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}
