// src/tracking/mod.rs
//! Sample sequence tracking and link diagnostics

pub mod sequence_tracker;
pub mod shared;
pub mod aux_monitor;

pub use sequence_tracker::*;
pub use shared::SharedTracker;
pub use aux_monitor::{AuxEvent, AuxMonitor, AuxStats};
