// tests/session_integration.rs
//! End-to-end monitoring sessions over the bundled sample sources

use bci_link_monitor::config::constants::packet::AUX_ACK_COUNT_INDEX;
use bci_link_monitor::hal::{
    ChannelSource, PacketType, ReaderSource, SampleRecord, SampleSource, SimulatedBoard,
    SimulatorConfig, StreamPacket,
};
use bci_link_monitor::report::{CsvReport, JsonLinesReport, ReportSink, TextReport};
use bci_link_monitor::session::{EndReason, MonitorSession, SessionConfig};
use bci_link_monitor::tracking::{ThresholdMode, TrackerConfig};
use bci_link_monitor::utils::time::MockTimeProvider;
use parking_lot::Mutex;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Writer whose bytes stay readable after the sink is boxed away
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).expect("utf-8 report")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn session<S: SampleSource>(
    source: S,
    tracker: TrackerConfig,
    config: SessionConfig,
) -> MonitorSession<S> {
    MonitorSession::new(source, &tracker, config)
        .expect("valid session")
        .with_time_provider(Arc::new(MockTimeProvider::new(0)))
}

fn simulator(config: SimulatorConfig) -> SimulatedBoard {
    SimulatedBoard::new(SimulatorConfig { seed: Some(1), ..config }).expect("valid simulator")
}

#[test]
fn test_isolated_drops_counted_once_each() {
    let board = simulator(SimulatorConfig {
        total_samples: Some(1000),
        drop_schedule: vec![10, 300, 700],
        ..Default::default()
    });

    let mut session = session(board, TrackerConfig::default(), SessionConfig::default());
    let report = session.run().expect("session runs");

    assert_eq!(report.end_reason, EndReason::SourceExhausted);
    assert_eq!(report.summary.total_count, 1000);
    assert_eq!(report.summary.bad_count, 3);
    assert!(!report.summary.aborted);
}

#[test]
fn test_threshold_aborts_and_releases_board() {
    let board = simulator(SimulatorConfig {
        total_samples: Some(5000),
        drop_every: Some(100),
        ..Default::default()
    });

    let mut session = session(board, TrackerConfig::default(), SessionConfig::default());
    let report = session.run().expect("session runs");

    assert!(report.aborted());
    assert_eq!(report.summary.bad_count, 5);
    // positions 100..=500 dropped; the fifth gap is seen at position 501
    assert_eq!(report.summary.total_count, 497);

    let board = session.into_source();
    assert!(!board.is_streaming());
    assert!(!board.is_connected());
}

#[test]
fn test_strict_mode_tolerates_threshold() {
    let board = simulator(SimulatorConfig {
        total_samples: Some(5000),
        drop_every: Some(100),
        ..Default::default()
    });
    let tracker = TrackerConfig {
        bad_threshold: 5,
        threshold_mode: ThresholdMode::Strict,
    };

    let report = session(board, tracker, SessionConfig::default())
        .run()
        .expect("session runs");
    assert!(report.aborted());
    assert_eq!(report.summary.bad_count, 6);
}

#[test]
fn test_run_time_caps_samples() {
    let board = simulator(SimulatorConfig::default());
    let config = SessionConfig {
        run_time_secs: Some(2),
        ..Default::default()
    };

    let report = session(board, TrackerConfig::default(), config)
        .run()
        .expect("session runs");
    assert_eq!(report.end_reason, EndReason::SampleLimit);
    assert_eq!(report.summary.total_count, 500);
}

#[test]
fn test_replayed_stream_with_garbage_and_gap() {
    let mut bytes = vec![0x00, 0x13, 0xA0, 0x42];
    for n in (0..=255u8).chain(0..20).filter(|&n| n != 7) {
        let packet = StreamPacket {
            sample_number: n,
            channels: [n as i32 - 128; 8],
            aux: [0; 6],
            packet_type: PacketType::Standard,
        };
        bytes.extend_from_slice(&packet.to_bytes());
    }

    let source = ReaderSource::new("capture", Cursor::new(bytes));
    let mut session = session(source, TrackerConfig::default(), SessionConfig::default());
    let report = session.run().expect("session runs");

    assert_eq!(report.end_reason, EndReason::SourceExhausted);
    // 7 missing from the first lap and from the second
    assert_eq!(report.summary.bad_count, 2);
    assert_eq!(report.summary.total_count, 274);
    assert!(session.source().reader_stats().discarded_bytes >= 4);
}

#[test]
fn test_channel_source_fed_by_producer_thread() {
    let (tx, source) = ChannelSource::bounded(32);

    let producer = thread::spawn(move || {
        for n in (0..=255u8).chain(0..100).filter(|&n| n != 50) {
            tx.send(SampleRecord::with_sample_number(n)).expect("consumer alive");
        }
    });

    let report = session(source, TrackerConfig::default(), SessionConfig::default())
        .run()
        .expect("session runs");
    producer.join().expect("producer finished");

    assert_eq!(report.end_reason, EndReason::SourceExhausted);
    assert_eq!(report.summary.total_count, 354);
    assert_eq!(report.summary.bad_count, 2);
}

#[test]
fn test_abort_releases_blocked_producer() {
    let (tx, source) = ChannelSource::bounded(4);
    let (done_tx, done_rx) = crossbeam::channel::bounded(1);

    // every other index: the link goes bad straight away
    let producer = thread::spawn(move || {
        let mut sent = 0usize;
        for i in 0..200usize {
            if tx.send(SampleRecord::with_sample_number((i * 2 % 256) as u8)).is_err() {
                break;
            }
            sent += 1;
        }
        done_tx.send(sent).expect("test still waiting");
    });

    let mut session = session(source, TrackerConfig::default(), SessionConfig::default());
    let report = session.run().expect("session runs");
    assert!(report.aborted());

    // the session is still alive, so only the disconnect can wake the producer
    let sent = done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("producer unblocked by disconnect");
    assert!(sent < 200);
    assert!(!session.source().is_connected());
    producer.join().expect("producer finished");
}

#[test]
fn test_link_events_in_text_report() {
    let text = SharedBuffer::default();
    let (tx, source) = ChannelSource::bounded(16);

    for (n, ack) in [(0u8, 0u8), (1, 0), (2, 1), (3, 1)] {
        let mut sample = SampleRecord::with_sample_number(n);
        sample.aux[AUX_ACK_COUNT_INDEX] = ack;
        tx.send(sample).expect("queue has room");
    }
    drop(tx);

    let config = SessionConfig {
        track_link_diagnostics: true,
        ..Default::default()
    };
    let report = session(source, TrackerConfig::default(), config)
        .with_sink(Box::new(TextReport::new(text.clone())))
        .run()
        .expect("session runs");

    assert_eq!(report.aux.expect("link stats").ack_changes, 1);
    assert_eq!(text.contents().matches("Last ack count 1").count(), 1);
}

#[test]
fn test_reports_written_by_every_sink() {
    let text = SharedBuffer::default();
    let csv = SharedBuffer::default();
    let json = SharedBuffer::default();

    let board = simulator(SimulatorConfig {
        total_samples: Some(3000),
        drop_schedule: vec![42],
        ..Default::default()
    });
    let sinks: Vec<Box<dyn ReportSink>> = vec![
        Box::new(TextReport::new(text.clone())),
        Box::new(CsvReport::new(csv.clone())),
        Box::new(JsonLinesReport::new(json.clone())),
    ];

    let mut session = session(board, TrackerConfig::default(), SessionConfig::default());
    for sink in sinks {
        session = session.with_sink(sink);
    }
    let report = session.run().expect("session runs");
    assert_eq!(report.summary.bad_count, 1);

    let text = text.contents();
    assert!(text.contains("err: expected 42 got 43"));
    // the final snapshot equals the one at 3000 and is not repeated
    assert_eq!(text.matches("Summary:").count(), 2);

    let csv = csv.contents();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.lines().last().expect("final row").ends_with(",3000,2999,1,false"));

    let events: Vec<serde_json::Value> = json
        .contents()
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(events.first().expect("start event")["event"], "session_started");
    let finished = events.last().expect("finish event");
    assert_eq!(finished["event"], "session_finished");
    assert_eq!(finished["end_reason"], "source_exhausted");
}
