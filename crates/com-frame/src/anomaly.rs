//! Stream anomaly taxonomy and parser counters
//!
//! Anomalies are never returned as errors. The parser absorbs them by
//! resynchronizing and records them here so callers can report them.

use thiserror::Error;

use crate::frame::ParserState;

/// Reasons a frame was abandoned or altered
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameAnomaly {
    /// A start marker arrived while a frame was already in progress
    #[error("unexpected '<' while in {0:?}, restarting frame")]
    UnexpectedStart(ParserState),

    /// A byte that is neither a digit nor '@' inside the id field
    #[error("invalid id byte 0x{0:02X}")]
    InvalidIdByte(u8),

    /// '@' arrived before any id digit
    #[error("frame has no id digits")]
    MissingId,

    /// The id field grew past the largest representable id
    #[error("frame id overflowed")]
    IdOverflow,

    /// The id did not match the configured filter
    #[error("id {id} does not match filter {filter}")]
    IdMismatch { id: u32, filter: u32 },

    /// The body reached capacity and was cut short
    #[error("body from id {id} truncated")]
    Truncated { id: u32 },
}

/// Counters accumulated by a decoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParserStats {
    /// Bytes consumed
    pub bytes: u64,
    /// Frames emitted (including truncated ones)
    pub frames: u64,
    /// Frames emitted after being cut at capacity
    pub truncated: u64,
    /// Frames dropped because their id did not match the filter
    pub filtered: u64,
    /// Frames abandoned because of malformed input
    pub resyncs: u64,
}

impl ParserStats {
    /// Count an anomaly
    pub fn record(&mut self, anomaly: &FrameAnomaly) {
        match anomaly {
            FrameAnomaly::Truncated { .. } => self.truncated += 1,
            FrameAnomaly::IdMismatch { .. } => self.filtered += 1,
            _ => self.resyncs += 1,
        }
    }
}
