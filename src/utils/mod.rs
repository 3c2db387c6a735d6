//! Common utility functions

pub mod time;

pub use time::{
    current_timestamp_millis,
    current_timestamp_nanos,
    sample_period_nanos,
    MockTimeProvider,
    SystemTimeProvider,
    TimeProvider,
};
