//! Serial Message Framing Library
//!
//! This crate turns an unstructured serial byte stream into discrete
//! application messages. Two decoding modes are available and one of them is
//! chosen once, before the first byte arrives:
//!
//! - **Framed**: a stateful parser recovers `<id@body>` frames, optionally
//!   keeping only the frames whose numeric source id matches a filter
//! - **Raw**: every byte is passed straight through, no framing at all
//!
//! # Frame Format
//! ```text
//! '<' digit+ '@' body-bytes '>'
//! ```
//!
//! There is no escape mechanism: a `>` always ends the body. Malformed input
//! never produces an error; the parser silently resynchronizes on the next
//! `<` and counts what it threw away in [`ParserStats`].
//!
//! # Example
//!
//! ```rust
//! use com_frame::{DecodeMode, Decoded, Decoder};
//!
//! let mut decoder = Decoder::new(DecodeMode::Framed { filter: Some(5) });
//! let out: Vec<Decoded> = decoder.decode(b"noise<9@skip><5@hello>".iter().copied()).collect();
//!
//! assert_eq!(out.len(), 1);
//! match &out[0] {
//!     Decoded::Message(msg) => assert_eq!(msg.text(), "hello"),
//!     Decoded::Byte(_) => unreachable!(),
//! }
//! ```

pub mod anomaly;
pub mod frame;
pub mod message;
pub mod raw;

pub use anomaly::{FrameAnomaly, ParserStats};
pub use frame::{FrameParser, ParserState, END, ID_DELIMITER, MESSAGE_CAPACITY, START};
pub use message::Message;
pub use raw::RawPassthrough;

/// Decoding mode, fixed for the lifetime of a [`Decoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeMode {
    /// Emit every byte as it arrives
    Raw,
    /// Run the frame parser; `None` accepts every source id
    Framed { filter: Option<u32> },
}

impl DecodeMode {
    /// Pick the mode for a filter setting
    ///
    /// A configured filter always selects framed mode. Without one, raw
    /// passthrough is used unless framing is forced.
    pub fn select(filter: Option<u32>, force_framed: bool) -> Self {
        match (filter, force_framed) {
            (Some(id), _) => DecodeMode::Framed { filter: Some(id) },
            (None, true) => DecodeMode::Framed { filter: None },
            (None, false) => DecodeMode::Raw,
        }
    }

    /// Returns a human-readable name for the mode
    pub fn name(&self) -> &'static str {
        match self {
            DecodeMode::Raw => "raw passthrough",
            DecodeMode::Framed { filter: Some(_) } => "framed (filtered)",
            DecodeMode::Framed { filter: None } => "framed (all ids)",
        }
    }
}

/// A unit of decoded output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A single byte from raw passthrough mode
    Byte(u8),
    /// A completed frame from framed mode
    Message(Message),
}

/// Mode-selected decoder
///
/// The two modes are distinct implementations; raw passthrough is not a
/// degenerate configuration of the frame parser.
#[derive(Debug)]
pub enum Decoder {
    Raw(RawPassthrough),
    Framed(FrameParser),
}

impl Decoder {
    /// Create a decoder for the given mode
    pub fn new(mode: DecodeMode) -> Self {
        match mode {
            DecodeMode::Raw => Decoder::Raw(RawPassthrough::new()),
            DecodeMode::Framed { filter } => Decoder::Framed(FrameParser::new(filter)),
        }
    }

    /// The mode this decoder was created with
    pub fn mode(&self) -> DecodeMode {
        match self {
            Decoder::Raw(_) => DecodeMode::Raw,
            Decoder::Framed(parser) => DecodeMode::Framed {
                filter: parser.filter(),
            },
        }
    }

    /// Consume one byte, returning any output it completes
    pub fn push_byte(&mut self, byte: u8) -> Option<Decoded> {
        match self {
            Decoder::Raw(raw) => raw.push_byte(byte).map(Decoded::Byte),
            Decoder::Framed(parser) => parser.push_byte(byte).map(Decoded::Message),
        }
    }

    /// Lazily decode a byte source
    ///
    /// The returned iterator pulls bytes only as far as needed to produce the
    /// next output, so it works over unbounded sources.
    pub fn decode<I>(&mut self, bytes: I) -> DecodeIter<'_, I::IntoIter>
    where
        I: IntoIterator<Item = u8>,
    {
        DecodeIter {
            decoder: self,
            bytes: bytes.into_iter(),
        }
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> ParserStats {
        match self {
            Decoder::Raw(raw) => raw.stats(),
            Decoder::Framed(parser) => parser.stats(),
        }
    }
}

/// Iterator returned by [`Decoder::decode`]
pub struct DecodeIter<'a, I> {
    decoder: &'a mut Decoder,
    bytes: I,
}

impl<I> Iterator for DecodeIter<'_, I>
where
    I: Iterator<Item = u8>,
{
    type Item = Decoded;

    fn next(&mut self) -> Option<Self::Item> {
        for byte in self.bytes.by_ref() {
            if let Some(out) = self.decoder.push_byte(byte) {
                return Some(out);
            }
        }
        None
    }
}
