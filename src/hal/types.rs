// src/hal/types.rs
//! Core types shared by every sample source

use crate::config::constants::packet::{AUX_BYTES, CHANNEL_COUNT};
use serde::{Deserialize, Serialize};

/// Packet type carried in the low nibble of the stop byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketType {
    #[default]
    Standard,
    TimeSynced,
    UserDefined,
    RawAux,
    Other(u8),
}

impl PacketType {
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0 => PacketType::Standard,
            1 => PacketType::TimeSynced,
            2 => PacketType::UserDefined,
            3 => PacketType::RawAux,
            n => PacketType::Other(n),
        }
    }

    pub fn nibble(self) -> u8 {
        match self {
            PacketType::Standard => 0,
            PacketType::TimeSynced => 1,
            PacketType::UserDefined => 2,
            PacketType::RawAux => 3,
            PacketType::Other(n) => n & 0x0F,
        }
    }
}

/// One sample as delivered by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// 8-bit wrapping counter stamped by the board
    pub sample_number: u8,
    /// Raw signed 24-bit ADC counts
    pub channels: Vec<i32>,
    pub aux: [u8; AUX_BYTES],
    pub packet_type: PacketType,
    /// Host receive time
    pub received_at_ns: u64,
}

impl SampleRecord {
    /// Blank record carrying only a sample number
    pub fn with_sample_number(sample_number: u8) -> Self {
        Self {
            sample_number,
            channels: vec![0; CHANNEL_COUNT],
            aux: [0; AUX_BYTES],
            packet_type: PacketType::Standard,
            received_at_ns: 0,
        }
    }

    /// Board clock in milliseconds, present on time-synced packets only
    pub fn board_time_ms(&self) -> Option<u32> {
        match self.packet_type {
            PacketType::TimeSynced => Some(u32::from_be_bytes([
                self.aux[2],
                self.aux[3],
                self.aux[4],
                self.aux[5],
            ])),
            _ => None,
        }
    }

    /// First two aux bytes as a signed big-endian value
    pub fn aux_value(&self) -> i16 {
        i16::from_be_bytes([self.aux[0], self.aux[1]])
    }
}

/// Description of a sample source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub kind: SourceKind,
    pub channel_count: usize,
    pub sample_rate_hz: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Simulator,
    Stream,
    Channel,
}
