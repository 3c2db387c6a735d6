//! Simulated streaming board with sample drop injection
//!
//! Emits the same wrapping sample counter a real board does. Drops can be
//! injected at fixed positions, periodically, or at random with a seeded RNG,
//! which makes every link-loss scenario reproducible in tests.

use crate::config::constants::{packet, sequence, session, simulation};
use crate::hal::traits::{SampleSource, SourceError};
use crate::hal::types::{PacketType, SampleRecord, SourceInfo, SourceKind};
use crate::utils::time::{current_timestamp_nanos, sample_period_nanos};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulatorConfig {
    #[serde(default = "defaults::channel_count")]
    pub channel_count: usize,

    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// Stop after emitting this many samples; unbounded when absent
    #[serde(default)]
    pub total_samples: Option<u64>,

    /// Board positions (0-based, before wrapping) that never arrive
    #[serde(default)]
    pub drop_schedule: Vec<u64>,

    /// Drop every n-th board position (n >= 2)
    #[serde(default)]
    pub drop_every: Option<u64>,

    /// Independent per-sample drop probability in [0, 1)
    #[serde(default = "defaults::drop_probability")]
    pub drop_probability: f64,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "defaults::signal_amplitude_counts")]
    pub signal_amplitude_counts: f64,

    #[serde(default = "defaults::signal_frequency_hz")]
    pub signal_frequency_hz: f64,

    /// Sleep one sample period between samples
    #[serde(default)]
    pub pace_realtime: bool,
}

mod defaults {
    use super::{session, simulation};

    pub fn channel_count() -> usize { simulation::DEFAULT_CHANNEL_COUNT }
    pub fn sample_rate_hz() -> u32 { session::DEFAULT_SAMPLE_RATE_HZ }
    pub fn drop_probability() -> f64 { simulation::DEFAULT_DROP_PROBABILITY }
    pub fn signal_amplitude_counts() -> f64 { simulation::DEFAULT_SIGNAL_AMPLITUDE_COUNTS }
    pub fn signal_frequency_hz() -> f64 { simulation::DEFAULT_SIGNAL_FREQUENCY_HZ }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            channel_count: defaults::channel_count(),
            sample_rate_hz: defaults::sample_rate_hz(),
            total_samples: None,
            drop_schedule: Vec::new(),
            drop_every: None,
            drop_probability: defaults::drop_probability(),
            seed: None,
            signal_amplitude_counts: defaults::signal_amplitude_counts(),
            signal_frequency_hz: defaults::signal_frequency_hz(),
            pace_realtime: false,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_count == 0 || self.channel_count > packet::CHANNEL_COUNT {
            return Err(format!(
                "channel_count must be between 1 and {}, got {}",
                packet::CHANNEL_COUNT,
                self.channel_count
            ));
        }
        let rates = session::MIN_SAMPLE_RATE_HZ..=session::MAX_SAMPLE_RATE_HZ;
        if !rates.contains(&self.sample_rate_hz) {
            return Err(format!("sample_rate_hz out of range: {}", self.sample_rate_hz));
        }
        if !(0.0..1.0).contains(&self.drop_probability) {
            return Err(format!(
                "drop_probability must be in [0, 1), got {}",
                self.drop_probability
            ));
        }
        if let Some(every) = self.drop_every {
            if every < 2 {
                return Err(format!("drop_every must be at least 2, got {}", every));
            }
        }
        Ok(())
    }
}

/// Simulated board
pub struct SimulatedBoard {
    config: SimulatorConfig,
    drop_schedule: BTreeSet<u64>,
    rng: StdRng,
    period_nanos: u64,
    /// Next board position to generate
    position: u64,
    emitted: u64,
    dropped: u64,
    stream_start_ns: u64,
    streaming: bool,
    connected: bool,
}

impl SimulatedBoard {
    pub fn new(config: SimulatorConfig) -> Result<Self, SourceError> {
        config.validate().map_err(SourceError::Configuration)?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            drop_schedule: config.drop_schedule.iter().copied().collect(),
            period_nanos: sample_period_nanos(config.sample_rate_hz),
            rng,
            config,
            position: 0,
            emitted: 0,
            dropped: 0,
            stream_start_ns: 0,
            streaming: false,
            connected: true,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn emitted_samples(&self) -> u64 {
        self.emitted
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn should_drop(&mut self, position: u64) -> bool {
        if self.drop_schedule.contains(&position) {
            return true;
        }
        if let Some(every) = self.config.drop_every {
            if position > 0 && position % every == 0 {
                return true;
            }
        }
        self.config.drop_probability > 0.0 && self.rng.gen_bool(self.config.drop_probability)
    }

    fn generate(&self, position: u64) -> SampleRecord {
        let t = position as f64 / f64::from(self.config.sample_rate_hz);
        let channels = (0..self.config.channel_count)
            .map(|channel| {
                let phase = channel as f64 * std::f64::consts::FRAC_PI_4;
                let angle = std::f64::consts::TAU * self.config.signal_frequency_hz * t + phase;
                (self.config.signal_amplitude_counts * angle.sin()) as i32
            })
            .collect();

        SampleRecord {
            sample_number: (position % u64::from(sequence::SEQUENCE_MODULUS)) as u8,
            channels,
            aux: [0; packet::AUX_BYTES],
            packet_type: PacketType::Standard,
            received_at_ns: self.stream_start_ns + position * self.period_nanos,
        }
    }
}

impl SampleSource for SimulatedBoard {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "Simulated Board".to_string(),
            kind: SourceKind::Simulator,
            channel_count: self.config.channel_count,
            sample_rate_hz: Some(self.config.sample_rate_hz),
        }
    }

    fn start_stream(&mut self) -> Result<(), SourceError> {
        if !self.connected {
            return Err(SourceError::NotStreaming);
        }
        self.stream_start_ns = current_timestamp_nanos();
        self.streaming = true;
        info!(
            sample_rate_hz = self.config.sample_rate_hz,
            channels = self.config.channel_count,
            "simulated stream started"
        );
        Ok(())
    }

    fn next_sample(&mut self) -> Result<Option<SampleRecord>, SourceError> {
        if !self.streaming {
            return Err(SourceError::NotStreaming);
        }
        if let Some(total) = self.config.total_samples {
            if self.emitted >= total {
                return Ok(None);
            }
        }

        loop {
            let position = self.position;
            self.position += 1;

            if self.should_drop(position) {
                self.dropped += 1;
                debug!(position, "dropping simulated sample");
                continue;
            }

            if self.config.pace_realtime && self.period_nanos > 0 {
                std::thread::sleep(Duration::from_nanos(self.period_nanos));
            }

            self.emitted += 1;
            return Ok(Some(self.generate(position)));
        }
    }

    fn stop_stream(&mut self) -> Result<(), SourceError> {
        if self.streaming {
            info!(emitted = self.emitted, dropped = self.dropped, "simulated stream stopped");
        }
        self.streaming = false;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        self.streaming = false;
        self.connected = false;
        Ok(())
    }
}
