//! Raw passthrough decoder
//!
//! Used when no source filter is configured. Every byte is output as soon as
//! it arrives and nothing is interpreted.

use crate::ParserStats;

/// Byte-for-byte passthrough
#[derive(Debug, Default)]
pub struct RawPassthrough {
    stats: ParserStats,
}

impl RawPassthrough {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one byte; always yields it back
    pub fn push_byte(&mut self, byte: u8) -> Option<u8> {
        self.stats.bytes += 1;
        Some(byte)
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }
}
