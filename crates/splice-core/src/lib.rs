//! Splice Core - Foundation types for editorial timelines
//!
//! This crate provides the types every other Splice crate builds on:
//! - Exact rational time (RationalTime) and half-open ranges (TimeRange)
//! - SMPTE timecode and time-string conversions
//! - Schema labels carried by every encoded object
//! - The shared error type and its taxonomy

pub mod error;
pub mod label;
pub mod range;
pub mod time;
pub mod timecode;

pub use error::{ErrorKind, Result, SpliceError};
pub use label::SchemaLabel;
pub use range::TimeRange;
pub use time::{ratio_from_f64, ratio_to_f64, RationalTime};
pub use timecode::{DropFrame, FrameRounding};

/// Rates the editorial tools most commonly work in.
pub mod rates {
    pub const FPS_23_976: f64 = 24000.0 / 1001.0;
    pub const FPS_24: f64 = 24.0;
    pub const FPS_25: f64 = 25.0;
    pub const FPS_29_97: f64 = 30000.0 / 1001.0;
    pub const FPS_30: f64 = 30.0;
    pub const FPS_59_94: f64 = 60000.0 / 1001.0;
    pub const FPS_60: f64 = 60.0;
}
