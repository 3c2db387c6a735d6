// src/session/monitor.rs
//! Session controller
//!
//! Pulls samples from a [`SampleSource`], classifies each sample number with a
//! [`SequenceGapTracker`] and fans results out to report sinks. When the
//! tracker reports the bad-packet threshold the stream is stopped and the
//! source disconnected before the session returns.

use crate::error::{MonitorError, MonitorResult};
use crate::error_context;
use crate::hal::{SampleSource, SourceError, SourceInfo};
use crate::report::{ReportError, ReportSink};
use crate::session::SessionConfig;
use crate::tracking::{
    AuxEvent, AuxMonitor, AuxStats, SequenceGapTracker, TrackerConfig, TrackerSummary,
};
use crate::utils::time::{SystemTimeProvider, TimeProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    BadPacketThreshold,
    SampleLimit,
    SourceExhausted,
    /// The source or a sink failed; `run` returns the error
    Failed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::BadPacketThreshold => write!(f, "bad packet threshold reached"),
            EndReason::SampleLimit => write!(f, "sample limit reached"),
            EndReason::SourceExhausted => write!(f, "source exhausted"),
            EndReason::Failed => write!(f, "session failed"),
        }
    }
}

/// Final outcome of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub source: SourceInfo,
    pub summary: TrackerSummary,
    pub end_reason: EndReason,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux: Option<AuxStats>,
}

impl SessionReport {
    pub fn aborted(&self) -> bool {
        self.end_reason == EndReason::BadPacketThreshold
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_at_ms.saturating_sub(self.started_at_ms)
    }
}

pub struct MonitorSession<S: SampleSource> {
    source: S,
    tracker: SequenceGapTracker,
    config: SessionConfig,
    sinks: Vec<Box<dyn ReportSink>>,
    clock: Arc<dyn TimeProvider>,
    aux: Option<AuxMonitor>,
    /// Last snapshot handed to the sinks
    last_summary: Option<TrackerSummary>,
}

impl<S: SampleSource> MonitorSession<S> {
    pub fn new(source: S, tracker: &TrackerConfig, config: SessionConfig) -> MonitorResult<Self> {
        config.validate().map_err(|reason| MonitorError::Session {
            reason,
            context: error_context!("session", "new"),
        })?;
        let tracker = SequenceGapTracker::new(tracker)?;
        let aux = config.track_link_diagnostics.then(AuxMonitor::new);

        Ok(Self {
            source,
            tracker,
            config,
            sinks: Vec::new(),
            clock: Arc::new(SystemTimeProvider),
            aux,
            last_summary: None,
        })
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn tracker(&self) -> &SequenceGapTracker {
        &self.tracker
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Run until abort, the sample limit, or the source runs dry.
    ///
    /// Sinks always receive the final totals, also when the source fails.
    pub fn run(&mut self) -> MonitorResult<SessionReport> {
        let started_at_ms = self.clock.now_millis();
        let info = self.source.info();

        self.source.start_stream().map_err(|err| {
            MonitorError::from_source(err, error_context!("session", "start_stream"))
        })?;
        info!(source = %info.name, threshold = self.tracker.bad_threshold(), "session started");

        let started = emit(&mut self.sinks, |sink| sink.session_started(&info, started_at_ms));
        if let Err(err) = started {
            self.abandon();
            return Err(MonitorError::from_report(
                err,
                error_context!("session", "session_started"),
            ));
        }

        let end_reason = match self.pump() {
            Ok(reason) => reason,
            Err(err) => {
                self.abandon();
                self.finish_after_failure(info, started_at_ms);
                return Err(err);
            }
        };

        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close source cleanly");
            self.finish_after_failure(info, started_at_ms);
            return Err(MonitorError::from_source(err, error_context!("session", "close")));
        }

        let report = self.build_report(info, end_reason, started_at_ms);
        self.emit_final(&report)
            .map_err(|err| MonitorError::from_report(err, error_context!("session", "finish")))?;

        info!(
            total = report.summary.total_count,
            good = report.summary.good_count,
            bad = report.summary.bad_count,
            reason = %end_reason,
            "session finished"
        );
        Ok(report)
    }

    fn pump(&mut self) -> MonitorResult<EndReason> {
        let limit = self.config.sample_limit();
        let interval = self.config.summary_interval_samples;
        let mut observed: u64 = 0;

        loop {
            if limit.is_some_and(|limit| observed >= limit) {
                debug!(observed, "sample limit reached");
                return Ok(EndReason::SampleLimit);
            }

            let sample = match self.source.next_sample() {
                Ok(Some(sample)) => sample,
                Ok(None) => return Ok(EndReason::SourceExhausted),
                Err(err) => {
                    let context = error_context!("session", "next_sample");
                    return Err(MonitorError::from_source(err, context));
                }
            };

            let outcome = self.tracker.observe(i64::from(sample.sample_number))?;
            observed += 1;

            if let Some(gap) = outcome.gap() {
                warn!("expected {} got {}", gap.expected, gap.received);
                let now = self.clock.now_millis();
                emit(&mut self.sinks, |sink| sink.mismatch(&gap, now)).map_err(|err| {
                    MonitorError::from_report(err, error_context!("session", "mismatch"))
                })?;
            }

            if let Some(aux) = self.aux.as_mut() {
                let events = aux.observe(&sample);
                if !events.is_empty() {
                    events.iter().for_each(log_link_event);
                    let now = self.clock.now_millis();
                    emit(&mut self.sinks, |sink| {
                        events.iter().try_for_each(|event| sink.link_event(event, now))
                    })
                    .map_err(|err| {
                        MonitorError::from_report(err, error_context!("session", "link_event"))
                    })?;
                }
            }

            if interval > 0 && observed % interval == 0 {
                let summary = self.tracker.summary();
                let now = self.clock.now_millis();
                info!(
                    total = summary.total_count,
                    good = summary.good_count,
                    bad = summary.bad_count,
                    "summary"
                );
                emit(&mut self.sinks, |sink| sink.summary(&summary, now)).map_err(|err| {
                    MonitorError::from_report(err, error_context!("session", "summary"))
                })?;
                self.last_summary = Some(summary);
            }

            if outcome.aborted {
                warn!(
                    bad = self.tracker.summary().bad_count,
                    threshold = self.tracker.bad_threshold(),
                    "bad packet threshold reached, stopping stream"
                );
                return Ok(EndReason::BadPacketThreshold);
            }
        }
    }

    fn build_report(
        &self,
        source: SourceInfo,
        end_reason: EndReason,
        started_at_ms: u64,
    ) -> SessionReport {
        SessionReport {
            source,
            summary: self.tracker.summary(),
            end_reason,
            started_at_ms,
            finished_at_ms: self.clock.now_millis(),
            aux: self.aux.as_ref().map(AuxMonitor::stats),
        }
    }

    /// Closing summary, skipped when the last periodic one already matches
    fn emit_final(&mut self, report: &SessionReport) -> Result<(), ReportError> {
        let summary = report.summary;
        if self.last_summary != Some(summary) {
            emit(&mut self.sinks, |sink| sink.summary(&summary, report.finished_at_ms))?;
            self.last_summary = Some(summary);
        }
        emit(&mut self.sinks, |sink| sink.session_finished(report))
    }

    fn finish_after_failure(&mut self, source: SourceInfo, started_at_ms: u64) {
        let report = self.build_report(source, EndReason::Failed, started_at_ms);
        if let Err(err) = self.emit_final(&report) {
            warn!(error = %err, "could not report totals after failure");
        }
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.source.stop_stream()?;
        self.source.disconnect()
    }

    /// Best effort cleanup on the error path
    fn abandon(&mut self) {
        if let Err(err) = self.source.disconnect() {
            warn!(error = %err, "disconnect after failure also failed");
        }
    }
}

fn log_link_event(event: &AuxEvent) {
    match event {
        AuxEvent::AckCountChanged { current, .. } => info!("last ack count {}", current),
        AuxEvent::SampleHeld { sample_number, times } => {
            info!("{} was held by device {} times", sample_number, times)
        }
    }
}

fn emit<F>(sinks: &mut [Box<dyn ReportSink>], mut f: F) -> Result<(), ReportError>
where
    F: FnMut(&mut dyn ReportSink) -> Result<(), ReportError>,
{
    for sink in sinks.iter_mut() {
        f(sink.as_mut())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::packet::{AUX_ACK_COUNT_INDEX, AUX_HOLD_COUNT_INDEX};
    use crate::hal::{SampleRecord, SourceKind};
    use crate::tracking::SequenceGap;
    use crate::utils::time::MockTimeProvider;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Log {
        calls: Vec<&'static str>,
    }

    struct ScriptedSource {
        samples: std::vec::IntoIter<SampleRecord>,
        fail_after: Option<usize>,
        served: usize,
        log: Arc<Mutex<Log>>,
    }

    impl ScriptedSource {
        fn from_records(samples: Vec<SampleRecord>, log: Arc<Mutex<Log>>) -> Self {
            Self {
                samples: samples.into_iter(),
                fail_after: None,
                served: 0,
                log,
            }
        }
    }

    impl SampleSource for ScriptedSource {
        fn info(&self) -> SourceInfo {
            SourceInfo {
                name: "Scripted".to_string(),
                kind: SourceKind::Stream,
                channel_count: 8,
                sample_rate_hz: None,
            }
        }

        fn start_stream(&mut self) -> Result<(), SourceError> {
            self.log.lock().calls.push("start");
            Ok(())
        }

        fn next_sample(&mut self) -> Result<Option<SampleRecord>, SourceError> {
            if self.fail_after == Some(self.served) {
                return Err(SourceError::Timeout { timeout_ms: 5 });
            }
            self.served += 1;
            Ok(self.samples.next())
        }

        fn stop_stream(&mut self) -> Result<(), SourceError> {
            self.log.lock().calls.push("stop");
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), SourceError> {
            self.log.lock().calls.push("disconnect");
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorded {
        gaps: Vec<SequenceGap>,
        links: Vec<AuxEvent>,
        summaries: Vec<TrackerSummary>,
        finished: Option<EndReason>,
    }

    struct RecordingSink(Arc<Mutex<Recorded>>);

    impl ReportSink for RecordingSink {
        fn mismatch(&mut self, gap: &SequenceGap, _at_ms: u64) -> Result<(), ReportError> {
            self.0.lock().gaps.push(*gap);
            Ok(())
        }

        fn link_event(&mut self, event: &AuxEvent, _at_ms: u64) -> Result<(), ReportError> {
            self.0.lock().links.push(*event);
            Ok(())
        }

        fn summary(&mut self, summary: &TrackerSummary, _at_ms: u64) -> Result<(), ReportError> {
            self.0.lock().summaries.push(*summary);
            Ok(())
        }

        fn session_finished(&mut self, report: &SessionReport) -> Result<(), ReportError> {
            self.0.lock().finished = Some(report.end_reason);
            Ok(())
        }
    }

    type Harness = (MonitorSession<ScriptedSource>, Arc<Mutex<Log>>, Arc<Mutex<Recorded>>);

    fn session_over(records: Vec<SampleRecord>, config: SessionConfig) -> Harness {
        let log = Arc::new(Mutex::new(Log::default()));
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let session = MonitorSession::new(
            ScriptedSource::from_records(records, log.clone()),
            &TrackerConfig::default(),
            config,
        )
        .unwrap()
        .with_sink(Box::new(RecordingSink(recorded.clone())))
        .with_time_provider(Arc::new(MockTimeProvider::new(1_000_000_000)));
        (session, log, recorded)
    }

    fn session(samples: Vec<u8>, config: SessionConfig) -> Harness {
        let records = samples.into_iter().map(SampleRecord::with_sample_number).collect();
        session_over(records, config)
    }

    #[test]
    fn test_clean_run_until_exhausted() {
        let samples = (0..=255).chain(0..10).collect();
        let (mut session, log, recorded) = session(samples, SessionConfig::default());
        let report = session.run().unwrap();

        assert_eq!(report.end_reason, EndReason::SourceExhausted);
        assert_eq!(report.summary.total_count, 266);
        assert_eq!(report.summary.bad_count, 0);
        assert_eq!(report.started_at_ms, 1_000);
        assert_eq!(log.lock().calls, vec!["start", "stop", "disconnect"]);

        let recorded = recorded.lock();
        assert_eq!(recorded.summaries.len(), 1);
        assert_eq!(recorded.finished, Some(EndReason::SourceExhausted));
    }

    #[test]
    fn test_abort_stops_then_disconnects() {
        // every other index missing: every sample after the first is bad
        let samples = (0..20u8).map(|n| n * 2).collect();
        let (mut session, log, recorded) = session(samples, SessionConfig::default());
        let report = session.run().unwrap();

        assert!(report.aborted());
        assert_eq!(report.summary.bad_count, 5);
        assert_eq!(report.summary.total_count, 6);
        assert!(report.summary.aborted);
        assert_eq!(log.lock().calls, vec!["start", "stop", "disconnect"]);
        assert_eq!(recorded.lock().gaps[0], SequenceGap { expected: 1, received: 2 });
        assert_eq!(recorded.lock().gaps.len(), 5);
    }

    #[test]
    fn test_sample_limit() {
        let config = SessionConfig {
            max_samples: Some(100),
            summary_interval_samples: 25,
            ..Default::default()
        };
        let (mut session, _log, recorded) = session((0..=255).collect(), config);
        let report = session.run().unwrap();

        assert_eq!(report.end_reason, EndReason::SampleLimit);
        assert_eq!(report.summary.total_count, 100);

        // the snapshot at 100 already is the final state
        let totals: Vec<u64> = recorded.lock().summaries.iter().map(|s| s.total_count).collect();
        assert_eq!(totals, vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_final_summary_after_partial_interval() {
        let config = SessionConfig {
            summary_interval_samples: 25,
            ..Default::default()
        };
        let (mut session, _log, recorded) = session((0..30).collect(), config);
        session.run().unwrap();

        let totals: Vec<u64> = recorded.lock().summaries.iter().map(|s| s.total_count).collect();
        assert_eq!(totals, vec![25, 30]);
    }

    #[test]
    fn test_source_error_disconnects_and_propagates() {
        let (session, log, _recorded) = session((0..50).collect(), SessionConfig::default());
        let mut source = session.into_source();
        source.fail_after = Some(10);
        let mut session =
            MonitorSession::new(source, &TrackerConfig::default(), SessionConfig::default())
                .unwrap();

        let err = session.run().unwrap_err();
        assert!(matches!(err, MonitorError::Source { source: SourceError::Timeout { .. }, .. }));
        assert_eq!(log.lock().calls, vec!["start", "disconnect"]);
    }

    #[test]
    fn test_source_error_still_reports_totals() {
        let (mut session, log, recorded) = session((0..50).collect(), SessionConfig::default());
        session.source.fail_after = Some(10);

        let err = session.run().unwrap_err();
        assert!(matches!(err, MonitorError::Source { source: SourceError::Timeout { .. }, .. }));
        assert_eq!(log.lock().calls, vec!["start", "disconnect"]);

        let recorded = recorded.lock();
        assert_eq!(recorded.summaries.len(), 1);
        assert_eq!(recorded.summaries[0].total_count, 10);
        assert_eq!(recorded.summaries[0].good_count, 10);
        assert_eq!(recorded.finished, Some(EndReason::Failed));
    }

    #[test]
    fn test_link_diagnostics_reported() {
        let config = SessionConfig {
            track_link_diagnostics: true,
            ..Default::default()
        };
        let (mut session, _log, recorded) = session((0..10).collect(), config);
        let report = session.run().unwrap();
        assert_eq!(report.aux, Some(AuxStats::default()));
        assert!(recorded.lock().links.is_empty());
    }

    #[test]
    fn test_link_events_reach_sinks() {
        let acks = [0u8, 0, 1, 1, 2];
        let records = acks
            .iter()
            .enumerate()
            .map(|(n, &ack)| {
                let mut record = SampleRecord::with_sample_number(n as u8);
                record.aux[AUX_ACK_COUNT_INDEX] = ack;
                if n == 3 {
                    record.aux[AUX_HOLD_COUNT_INDEX] = 2;
                }
                record
            })
            .collect();
        let config = SessionConfig {
            track_link_diagnostics: true,
            ..Default::default()
        };
        let (mut session, _log, recorded) = session_over(records, config);
        let report = session.run().unwrap();

        assert_eq!(
            recorded.lock().links,
            vec![
                AuxEvent::AckCountChanged { previous: 0, current: 1 },
                AuxEvent::SampleHeld { sample_number: 3, times: 2 },
                AuxEvent::AckCountChanged { previous: 1, current: 2 },
            ]
        );
        let aux = report.aux.unwrap();
        assert_eq!(aux.ack_changes, 2);
        assert_eq!(aux.held_samples, 1);
    }

    #[test]
    fn test_link_events_skipped_when_not_tracked() {
        let mut record = SampleRecord::with_sample_number(0);
        record.aux[AUX_ACK_COUNT_INDEX] = 4;
        let (mut session, _log, recorded) = session_over(vec![record], SessionConfig::default());
        let report = session.run().unwrap();

        assert!(report.aux.is_none());
        assert!(recorded.lock().links.is_empty());
    }

    #[test]
    fn test_invalid_session_config() {
        let log = Arc::new(Mutex::new(Log::default()));
        let result = MonitorSession::new(
            ScriptedSource::from_records(Vec::new(), log),
            &TrackerConfig::default(),
            SessionConfig { sample_rate_hz: 0, ..Default::default() },
        );
        assert!(matches!(result, Err(MonitorError::Session { .. })));
    }
}
