// src/tracking/aux_monitor.rs
//! Radio link diagnostics carried in the aux bytes of each sample
//!
//! Link test firmware repurposes two aux bytes: one counts acks seen by the
//! radio, the other counts how many times the device held a sample back
//! before sending it.

use crate::config::constants::packet::{AUX_ACK_COUNT_INDEX, AUX_HOLD_COUNT_INDEX};
use crate::hal::SampleRecord;
use serde::{Deserialize, Serialize};

/// Notable change seen in the aux bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuxEvent {
    AckCountChanged { previous: u8, current: u8 },
    SampleHeld { sample_number: u8, times: u8 },
}

/// Cumulative aux diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuxStats {
    pub ack_changes: u64,
    pub held_samples: u64,
    pub total_holds: u64,
    pub last_ack_count: u8,
}

#[derive(Debug, Default)]
pub struct AuxMonitor {
    stats: AuxStats,
}

impl AuxMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, sample: &SampleRecord) -> Vec<AuxEvent> {
        let mut events = Vec::new();

        let ack_count = sample.aux[AUX_ACK_COUNT_INDEX];
        if ack_count != self.stats.last_ack_count {
            events.push(AuxEvent::AckCountChanged {
                previous: self.stats.last_ack_count,
                current: ack_count,
            });
            self.stats.ack_changes += 1;
            self.stats.last_ack_count = ack_count;
        }

        let holds = sample.aux[AUX_HOLD_COUNT_INDEX];
        if holds > 0 {
            events.push(AuxEvent::SampleHeld {
                sample_number: sample.sample_number,
                times: holds,
            });
            self.stats.held_samples += 1;
            self.stats.total_holds += u64::from(holds);
        }

        events
    }

    pub fn stats(&self) -> AuxStats {
        self.stats
    }
}
