// src/report/text.rs
//! Human-readable endurance log

use crate::hal::SourceInfo;
use crate::report::{ReportError, ReportSink};
use crate::session::SessionReport;
use crate::tracking::{AuxEvent, SequenceGap, TrackerSummary};
use std::io::Write;

pub struct TextReport<W> {
    writer: W,
}

impl<W: Write + Send> TextReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_counts(&mut self, summary: &TrackerSummary, indent: &str) -> Result<(), ReportError> {
        writeln!(self.writer, "{}Total Packets: {}", indent, summary.total_count)?;
        writeln!(self.writer, "{}\tGood Packets: {}", indent, summary.good_count)?;
        writeln!(self.writer, "{}\tBad Packets: {}", indent, summary.bad_count)?;
        Ok(())
    }
}

impl<W: Write + Send> ReportSink for TextReport<W> {
    fn session_started(&mut self, source: &SourceInfo, at_ms: u64) -> Result<(), ReportError> {
        writeln!(self.writer, "Sequence Endurance Test")?;
        writeln!(self.writer, "Source: {} ({:?})", source.name, source.kind)?;
        writeln!(self.writer, "START!")?;
        writeln!(self.writer, "Start (unix ms): {}", at_ms)?;
        Ok(())
    }

    fn mismatch(&mut self, gap: &SequenceGap, at_ms: u64) -> Result<(), ReportError> {
        writeln!(
            self.writer,
            "err: expected {} got {} at {} ms",
            gap.expected, gap.received, at_ms
        )?;
        Ok(())
    }

    fn link_event(&mut self, event: &AuxEvent, _at_ms: u64) -> Result<(), ReportError> {
        match event {
            AuxEvent::AckCountChanged { current, .. } => {
                writeln!(self.writer, "Last ack count {}", current)?;
            }
            AuxEvent::SampleHeld { sample_number, times } => {
                writeln!(self.writer, "{} was held by device {} times", sample_number, times)?;
            }
        }
        Ok(())
    }

    fn summary(&mut self, summary: &TrackerSummary, at_ms: u64) -> Result<(), ReportError> {
        writeln!(self.writer)?;
        writeln!(self.writer, "Summary:")?;
        self.write_counts(summary, "\t")?;
        writeln!(self.writer, "\tAt: {} ms", at_ms)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn session_finished(&mut self, report: &SessionReport) -> Result<(), ReportError> {
        writeln!(self.writer, "Finished: {}", report.end_reason)?;
        self.write_counts(&report.summary, "")?;
        if let Some(aux) = &report.aux {
            writeln!(
                self.writer,
                "Link: {} ack changes, {} held samples ({} holds)",
                aux.ack_changes, aux.held_samples, aux.total_holds
            )?;
        }
        writeln!(
            self.writer,
            "Duration: {} ms",
            report.finished_at_ms.saturating_sub(report.started_at_ms)
        )?;
        self.writer.flush()?;
        Ok(())
    }
}
