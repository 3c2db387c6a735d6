// src/hal/channel_source.rs
//! Sample source fed by producer threads over a bounded channel

use crate::config::constants::{packet, session};
use crate::hal::traits::{SampleSource, SourceError};
use crate::hal::types::{SampleRecord, SourceInfo, SourceKind};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendError, Sender};
use std::time::Duration;

/// Producer handle. Clone it once per producer thread; the source reports
/// exhaustion after every sender has been dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct SampleSender {
    tx: Sender<SampleRecord>,
}

impl SampleSender {
    /// Blocks while the queue is full
    pub fn send(&self, sample: SampleRecord) -> Result<(), SendError<SampleRecord>> {
        self.tx.send(sample)
    }
}

/// Single-consumer end of the channel. Disconnecting drops the receiver, so
/// producers see `send` fail instead of blocking on a full queue.
pub struct ChannelSource {
    rx: Option<Receiver<SampleRecord>>,
    recv_timeout: Duration,
    sample_rate_hz: Option<u32>,
    streaming: bool,
}

impl ChannelSource {
    pub fn bounded(capacity: usize) -> (SampleSender, Self) {
        let (tx, rx) = channel::bounded(capacity);
        (
            SampleSender { tx },
            Self {
                rx: Some(rx),
                recv_timeout: Duration::from_millis(session::DEFAULT_RECV_TIMEOUT_MS),
                sample_rate_hz: None,
                streaming: false,
            },
        )
    }

    /// Capped at one minute
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout.min(Duration::from_millis(session::MAX_RECV_TIMEOUT_MS));
        self
    }

    pub fn with_sample_rate(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = Some(sample_rate_hz);
        self
    }

    /// Samples waiting in the queue
    pub fn pending(&self) -> usize {
        self.rx.as_ref().map_or(0, Receiver::len)
    }

    pub fn is_connected(&self) -> bool {
        self.rx.is_some()
    }
}

impl SampleSource for ChannelSource {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "Channel".to_string(),
            kind: SourceKind::Channel,
            channel_count: packet::CHANNEL_COUNT,
            sample_rate_hz: self.sample_rate_hz,
        }
    }

    fn start_stream(&mut self) -> Result<(), SourceError> {
        if self.rx.is_none() {
            return Err(SourceError::NotStreaming);
        }
        self.streaming = true;
        Ok(())
    }

    fn next_sample(&mut self) -> Result<Option<SampleRecord>, SourceError> {
        let rx = match (&self.rx, self.streaming) {
            (Some(rx), true) => rx,
            _ => return Err(SourceError::NotStreaming),
        };

        match rx.recv_timeout(self.recv_timeout) {
            Ok(sample) => Ok(Some(sample)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(SourceError::Timeout {
                timeout_ms: self.recv_timeout.as_millis() as u64,
            }),
        }
    }

    fn stop_stream(&mut self) -> Result<(), SourceError> {
        self.streaming = false;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        self.streaming = false;
        self.rx = None;
        Ok(())
    }
}
