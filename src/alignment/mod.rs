//! Word timing reconstruction from model-predicted durations.

pub mod timestamps;

pub use timestamps::{join_timestamps, DURATION_DIVISOR};
