// src/hal/packet.rs
//! Stream packet framing
//!
//! Every streamed sample travels as a fixed 33-byte packet:
//!
//! | offset | size | content                                  |
//! |--------|------|------------------------------------------|
//! | 0      | 1    | start byte `0xA0`                        |
//! | 1      | 1    | sample number                            |
//! | 2      | 24   | 8 channels, 24-bit signed big-endian     |
//! | 26     | 6    | aux bytes                                |
//! | 32     | 1    | stop byte `0xC0 \| packet type`          |
//!
//! [`PacketReader`] pulls packets out of any byte stream and resynchronizes
//! on the start byte after line noise or a torn packet.

use crate::config::constants::packet::*;
use crate::hal::traits::{SampleSource, SourceError};
use crate::hal::types::{PacketType, SampleRecord, SourceInfo, SourceKind};
use crate::utils::time::{SystemTimeProvider, TimeProvider};
use std::io::{ErrorKind, Read};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Framing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("packet must be 33 bytes, got {0}")]
    InvalidSize(usize),

    #[error("bad start byte 0x{0:02X}")]
    BadStartByte(u8),

    #[error("bad stop byte 0x{0:02X}")]
    BadStopByte(u8),

    #[error("stream packets carry 8 channels, got {0}")]
    ChannelCount(usize),
}

/// Decoded stream packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPacket {
    pub sample_number: u8,
    pub channels: [i32; CHANNEL_COUNT],
    pub aux: [u8; AUX_BYTES],
    pub packet_type: PacketType,
}

impl StreamPacket {
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() != PACKET_SIZE_BYTES {
            return Err(PacketError::InvalidSize(bytes.len()));
        }
        if bytes[0] != STREAM_BYTE_START {
            return Err(PacketError::BadStartByte(bytes[0]));
        }

        let stop = bytes[STOP_BYTE_OFFSET];
        if stop & STOP_BYTE_MASK != STREAM_BYTE_STOP {
            return Err(PacketError::BadStopByte(stop));
        }

        let mut channels = [0i32; CHANNEL_COUNT];
        for (channel, value) in channels.iter_mut().enumerate() {
            let start = CHANNEL_DATA_OFFSET + channel * BYTES_PER_CHANNEL;
            *value = decode_i24(&bytes[start..start + BYTES_PER_CHANNEL]);
        }

        let mut aux = [0u8; AUX_BYTES];
        aux.copy_from_slice(&bytes[AUX_DATA_OFFSET..STOP_BYTE_OFFSET]);

        Ok(Self {
            sample_number: bytes[SAMPLE_NUMBER_OFFSET],
            channels,
            aux,
            packet_type: PacketType::from_nibble(stop & PACKET_TYPE_MASK),
        })
    }

    pub fn to_bytes(&self) -> [u8; PACKET_SIZE_BYTES] {
        let mut bytes = [0u8; PACKET_SIZE_BYTES];
        bytes[0] = STREAM_BYTE_START;
        bytes[SAMPLE_NUMBER_OFFSET] = self.sample_number;

        for (channel, &value) in self.channels.iter().enumerate() {
            let start = CHANNEL_DATA_OFFSET + channel * BYTES_PER_CHANNEL;
            bytes[start..start + BYTES_PER_CHANNEL].copy_from_slice(&encode_i24(value));
        }

        bytes[AUX_DATA_OFFSET..STOP_BYTE_OFFSET].copy_from_slice(&self.aux);
        bytes[STOP_BYTE_OFFSET] = STREAM_BYTE_STOP | self.packet_type.nibble();
        bytes
    }

    pub fn into_record(self, received_at_ns: u64) -> SampleRecord {
        SampleRecord {
            sample_number: self.sample_number,
            channels: self.channels.to_vec(),
            aux: self.aux,
            packet_type: self.packet_type,
            received_at_ns,
        }
    }
}

impl TryFrom<&SampleRecord> for StreamPacket {
    type Error = PacketError;

    fn try_from(record: &SampleRecord) -> Result<Self, Self::Error> {
        let channels: [i32; CHANNEL_COUNT] = record
            .channels
            .as_slice()
            .try_into()
            .map_err(|_| PacketError::ChannelCount(record.channels.len()))?;

        Ok(Self {
            sample_number: record.sample_number,
            channels,
            aux: record.aux,
            packet_type: record.packet_type,
        })
    }
}

fn decode_i24(bytes: &[u8]) -> i32 {
    let raw = (i32::from(bytes[0]) << 16) | (i32::from(bytes[1]) << 8) | i32::from(bytes[2]);
    // sign-extend from bit 23
    (raw << 8) >> 8
}

fn encode_i24(value: i32) -> [u8; 3] {
    let [_, b0, b1, b2] = value.to_be_bytes();
    [b0, b1, b2]
}

/// Framing statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub packets: u64,
    pub framing_errors: u64,
    pub discarded_bytes: u64,
}

/// Pulls stream packets out of a byte stream
pub struct PacketReader<R> {
    reader: R,
    buffer: Vec<u8>,
    stats: ReaderStats,
}

impl<R: Read> PacketReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(READ_CHUNK_BYTES + PACKET_SIZE_BYTES),
            stats: ReaderStats::default(),
        }
    }

    /// Next well-formed packet, or `None` at end of stream.
    ///
    /// Bytes before a start byte are discarded. A candidate whose stop byte is
    /// wrong costs one byte and the scan restarts from the next start byte.
    pub fn next_packet(&mut self) -> Result<Option<StreamPacket>, SourceError> {
        loop {
            self.align_to_start();

            if self.buffer.len() >= PACKET_SIZE_BYTES {
                match StreamPacket::parse(&self.buffer[..PACKET_SIZE_BYTES]) {
                    Ok(packet) => {
                        self.buffer.drain(..PACKET_SIZE_BYTES);
                        self.stats.packets += 1;
                        return Ok(Some(packet));
                    }
                    Err(e) => {
                        debug!("framing error, resyncing: {}", e);
                        self.stats.framing_errors += 1;
                        self.stats.discarded_bytes += 1;
                        self.buffer.drain(..1);
                        continue;
                    }
                }
            }

            let mut chunk = [0u8; READ_CHUNK_BYTES];
            let read = match self.reader.read(&mut chunk) {
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if read == 0 {
                if !self.buffer.is_empty() {
                    debug!("dropping {} trailing bytes of a partial packet", self.buffer.len());
                    self.stats.discarded_bytes += self.buffer.len() as u64;
                    self.buffer.clear();
                }
                return Ok(None);
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn align_to_start(&mut self) {
        let skip = self
            .buffer
            .iter()
            .position(|&b| b == STREAM_BYTE_START)
            .unwrap_or(self.buffer.len());

        if skip > 0 {
            self.stats.discarded_bytes += skip as u64;
            self.buffer.drain(..skip);
        }
    }
}

/// [`SampleSource`] over a byte stream: a capture file, a pipe, or a port
/// handle the caller has already opened
pub struct ReaderSource<R> {
    name: String,
    packets: PacketReader<R>,
    time_provider: Box<dyn TimeProvider>,
    sample_rate_hz: Option<u32>,
    streaming: bool,
    connected: bool,
}

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            packets: PacketReader::new(reader),
            time_provider: Box::new(SystemTimeProvider),
            sample_rate_hz: None,
            streaming: false,
            connected: true,
        }
    }

    pub fn with_time_provider(mut self, time_provider: Box<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = Some(sample_rate_hz);
        self
    }

    pub fn reader_stats(&self) -> ReaderStats {
        self.packets.stats()
    }
}

impl<R: Read + Send> SampleSource for ReaderSource<R> {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            kind: SourceKind::Stream,
            channel_count: CHANNEL_COUNT,
            sample_rate_hz: self.sample_rate_hz,
        }
    }

    fn start_stream(&mut self) -> Result<(), SourceError> {
        if !self.connected {
            return Err(SourceError::NotStreaming);
        }
        info!(source = %self.name, "stream started");
        self.streaming = true;
        Ok(())
    }

    fn next_sample(&mut self) -> Result<Option<SampleRecord>, SourceError> {
        if !self.streaming {
            return Err(SourceError::NotStreaming);
        }

        match self.packets.next_packet()? {
            Some(packet) => Ok(Some(packet.into_record(self.time_provider.now_nanos()))),
            None => {
                let stats = self.packets.stats();
                if stats.framing_errors > 0 {
                    warn!(
                        source = %self.name,
                        framing_errors = stats.framing_errors,
                        discarded_bytes = stats.discarded_bytes,
                        "stream ended with framing errors"
                    );
                }
                Ok(None)
            }
        }
    }

    fn stop_stream(&mut self) -> Result<(), SourceError> {
        self.streaming = false;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        self.streaming = false;
        self.connected = false;
        Ok(())
    }
}
