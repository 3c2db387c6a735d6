// src/hal/mod.rs
//! Sample source abstraction

pub mod traits;
pub mod types;
pub mod packet;
pub mod simulator;
pub mod channel_source;

pub use traits::*;
pub use types::*;
pub use packet::{PacketError, PacketReader, ReaderSource, ReaderStats, StreamPacket};
pub use simulator::{SimulatedBoard, SimulatorConfig};
pub use channel_source::{ChannelSource, SampleSender};
