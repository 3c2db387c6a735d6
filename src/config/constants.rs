// src/config/constants.rs
//! System-wide configuration constants

/// Sample sequence tracking constants
pub mod sequence {
    /// Sample numbers are an 8-bit wrapping counter
    pub const SEQUENCE_MODULUS: u16 = 256;
    pub const MAX_SAMPLE_INDEX: i64 = 255;
    pub const MIN_SAMPLE_INDEX: i64 = 0;

    pub const DEFAULT_BAD_THRESHOLD: u64 = 5;
    pub const MIN_BAD_THRESHOLD: u64 = 1;
}

/// Session controller constants
pub mod session {
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 250;
    pub const MIN_SAMPLE_RATE_HZ: u32 = 1;
    pub const MAX_SAMPLE_RATE_HZ: u32 = 16_000;

    /// Summary snapshot cadence used by the endurance runs
    pub const DEFAULT_SUMMARY_INTERVAL_SAMPLES: u64 = 1500;

    pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 1000;
    pub const MAX_RECV_TIMEOUT_MS: u64 = 60_000;
}

/// Stream packet framing constants
pub mod packet {
    pub const PACKET_SIZE_BYTES: usize = 33;
    pub const STREAM_BYTE_START: u8 = 0xA0;
    pub const STREAM_BYTE_STOP: u8 = 0xC0;
    pub const STOP_BYTE_MASK: u8 = 0xF0;
    pub const PACKET_TYPE_MASK: u8 = 0x0F;

    pub const CHANNEL_COUNT: usize = 8;
    pub const BYTES_PER_CHANNEL: usize = 3;
    pub const AUX_BYTES: usize = 6;

    pub const SAMPLE_NUMBER_OFFSET: usize = 1;
    pub const CHANNEL_DATA_OFFSET: usize = 2;
    pub const AUX_DATA_OFFSET: usize = CHANNEL_DATA_OFFSET + CHANNEL_COUNT * BYTES_PER_CHANNEL;
    pub const STOP_BYTE_OFFSET: usize = AUX_DATA_OFFSET + AUX_BYTES;

    /// Aux byte carrying the number of times the device held a sample
    pub const AUX_HOLD_COUNT_INDEX: usize = 4;
    /// Aux byte carrying the radio link ack counter
    pub const AUX_ACK_COUNT_INDEX: usize = 5;

    pub const READ_CHUNK_BYTES: usize = 256;
}

/// Simulation constants
pub mod simulation {
    pub const DEFAULT_CHANNEL_COUNT: usize = 8;
    pub const DEFAULT_DROP_PROBABILITY: f64 = 0.0;
    pub const DEFAULT_SIGNAL_AMPLITUDE_COUNTS: f64 = 4000.0;
    pub const DEFAULT_SIGNAL_FREQUENCY_HZ: f64 = 10.0;
}

/// Timing constants
pub mod time {
    pub const NANOSECONDS_PER_SECOND: u64 = 1_000_000_000;
    pub const NANOSECONDS_PER_MILLISECOND: u64 = 1_000_000;
}

/// Configuration file paths
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/bci-link-monitor/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/bci-link-monitor";
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
    pub const LOCAL_CONFIG_FILE: &str = "config/local.toml";

    /// Prefix for environment overrides, e.g. `BCIMON__TRACKER__BAD_THRESHOLD=3`
    pub const ENV_PREFIX: &str = "BCIMON__";
    pub const ENV_SEPARATOR: &str = "__";
}
