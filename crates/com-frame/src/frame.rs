//! Framed message parser
//!
//! Recovers `<id@body>` frames from a noisy byte stream one byte at a time.
//!
//! # State Machine
//! ```text
//!  AwaitingStart --'<'--> ReadingId --digit--> ReadingId
//!                             |
//!                            '@' (id accepted by filter)
//!                             v
//!                        ReadingBody --byte--> ReadingBody
//!                             |
//!                     '>' or capacity reached
//!                             v
//!                      MessageComplete --emit--> AwaitingStart
//! ```
//!
//! `MessageComplete` is left on the same byte that entered it: the message
//! is emitted immediately and the parser is back in `AwaitingStart` before
//! the next byte is examined.
//!
//! A `<` seen in `ReadingId` or `ReadingBody` discards the frame in flight
//! and starts a new one from that `<`.

use tracing::trace;

use crate::{FrameAnomaly, Message, ParserStats};

/// Frame start marker
pub const START: u8 = b'<';
/// Separates the id from the body
pub const ID_DELIMITER: u8 = b'@';
/// Frame end marker
pub const END: u8 = b'>';

/// Maximum body length; longer bodies are emitted truncated to this length
pub const MESSAGE_CAPACITY: usize = 99;

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParserState {
    /// Discarding bytes until a '<'
    #[default]
    AwaitingStart,
    /// Accumulating decimal id digits
    ReadingId,
    /// Buffering body bytes
    ReadingBody,
    /// Body finished, message about to be emitted
    MessageComplete,
}

/// Streaming `<id@body>` parser
#[derive(Debug)]
pub struct FrameParser {
    state: ParserState,
    filter: Option<u32>,
    id: u32,
    id_digits: usize,
    buffer: Vec<u8>,
    truncated: bool,
    stats: ParserStats,
}

impl FrameParser {
    /// Create a parser; `None` accepts frames from every id
    pub fn new(filter: Option<u32>) -> Self {
        Self {
            state: ParserState::AwaitingStart,
            filter,
            id: 0,
            id_digits: 0,
            buffer: Vec::with_capacity(MESSAGE_CAPACITY),
            truncated: false,
            stats: ParserStats::default(),
        }
    }

    pub fn filter(&self) -> Option<u32> {
        self.filter
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Consume one byte, returning the message it completes, if any
    pub fn push_byte(&mut self, byte: u8) -> Option<Message> {
        self.stats.bytes += 1;

        match self.state {
            ParserState::AwaitingStart | ParserState::MessageComplete => {
                if byte == START {
                    self.begin_frame();
                }
            }
            ParserState::ReadingId => self.read_id(byte),
            ParserState::ReadingBody => self.read_body(byte),
        }

        if self.state == ParserState::MessageComplete {
            Some(self.complete())
        } else {
            None
        }
    }

    fn read_id(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                let digit = u32::from(byte - b'0');
                match self.id.checked_mul(10).and_then(|n| n.checked_add(digit)) {
                    Some(id) => {
                        self.id = id;
                        self.id_digits += 1;
                    }
                    None => self.abandon(FrameAnomaly::IdOverflow),
                }
            }
            ID_DELIMITER if self.id_digits == 0 => self.abandon(FrameAnomaly::MissingId),
            ID_DELIMITER => self.accept_id(),
            START => self.restart(),
            other => self.abandon(FrameAnomaly::InvalidIdByte(other)),
        }
    }

    /// The only place the filter is consulted for a frame
    fn accept_id(&mut self) {
        if let Some(filter) = self.filter {
            if self.id != filter {
                self.abandon(FrameAnomaly::IdMismatch {
                    id: self.id,
                    filter,
                });
                return;
            }
        }
        self.buffer.clear();
        self.truncated = false;
        self.state = ParserState::ReadingBody;
    }

    fn read_body(&mut self, byte: u8) {
        match byte {
            END => self.state = ParserState::MessageComplete,
            START => self.restart(),
            _ if self.buffer.len() >= MESSAGE_CAPACITY => {
                self.note(FrameAnomaly::Truncated { id: self.id });
                self.truncated = true;
                self.state = ParserState::MessageComplete;
            }
            _ => self.buffer.push(byte),
        }
    }

    fn begin_frame(&mut self) {
        self.id = 0;
        self.id_digits = 0;
        self.buffer.clear();
        self.state = ParserState::ReadingId;
    }

    /// Stray '<' mid-frame: drop what we have and start over from here
    fn restart(&mut self) {
        self.note(FrameAnomaly::UnexpectedStart(self.state));
        self.begin_frame();
    }

    fn abandon(&mut self, anomaly: FrameAnomaly) {
        self.note(anomaly);
        self.reset();
    }

    fn note(&mut self, anomaly: FrameAnomaly) {
        trace!("{}", anomaly);
        self.stats.record(&anomaly);
    }

    fn complete(&mut self) -> Message {
        let body = std::mem::replace(&mut self.buffer, Vec::with_capacity(MESSAGE_CAPACITY));
        let message = Message::new(self.id, body, self.truncated);
        self.stats.frames += 1;
        self.reset();
        message
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.truncated = false;
        self.state = ParserState::AwaitingStart;
    }
}
