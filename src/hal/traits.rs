// src/hal/traits.rs
//! Core trait for sample source abstraction

use crate::hal::types::{SampleRecord, SourceInfo};
use thiserror::Error;

/// Errors raised by sample sources
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed packet: {0}")]
    Packet(#[from] crate::hal::packet::PacketError),

    #[error("no sample within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("source is not streaming")]
    NotStreaming,

    #[error("source configuration error: {0}")]
    Configuration(String),
}

/// Anything that yields board samples one at a time.
///
/// Sources are driven from a single consumer; `next_sample` blocks until a
/// sample is available, the source is exhausted (`Ok(None)`), or it fails.
pub trait SampleSource: Send {
    /// Describe the source
    fn info(&self) -> SourceInfo;

    /// Begin delivering samples
    fn start_stream(&mut self) -> Result<(), SourceError>;

    /// Next sample, or `None` once the source has nothing more to give
    fn next_sample(&mut self) -> Result<Option<SampleRecord>, SourceError>;

    /// Stop delivering samples
    fn stop_stream(&mut self) -> Result<(), SourceError>;

    /// Release the underlying device or stream
    fn disconnect(&mut self) -> Result<(), SourceError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn info(&self) -> SourceInfo {
        (**self).info()
    }

    fn start_stream(&mut self) -> Result<(), SourceError> {
        (**self).start_stream()
    }

    fn next_sample(&mut self) -> Result<Option<SampleRecord>, SourceError> {
        (**self).next_sample()
    }

    fn stop_stream(&mut self) -> Result<(), SourceError> {
        (**self).stop_stream()
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        (**self).disconnect()
    }
}
