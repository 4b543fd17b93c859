//! Output destinations for decoded data

use std::io::{self, Write};

use com_frame::Message;
use tracing::{debug, warn};

use crate::keystroke::{KeystrokeSink, VirtualKey};

/// Receives everything the monitor decodes
pub trait OutputSink {
    /// A completed frame; the body is followed by a line break
    fn emit_message(&mut self, message: &Message);

    /// A single raw-mode byte, emitted as-is
    fn emit_byte(&mut self, byte: u8);
}

/// Writes decoded output to a stream, flushing after every item
#[derive(Debug)]
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, parts: &[&[u8]]) {
        let result = parts
            .iter()
            .try_for_each(|part| self.out.write_all(part))
            .and_then(|()| self.out.flush());
        // A closed stdout should not stop the monitor
        if let Err(e) = result {
            debug!("Console write failed: {}", e);
        }
    }
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> OutputSink for ConsoleSink<W> {
    fn emit_message(&mut self, message: &Message) {
        self.write(&[message.body(), b"\n"]);
    }

    fn emit_byte(&mut self, byte: u8) {
        self.write(&[&[byte]]);
    }
}

/// Wraps a sink and replays its output as keystrokes
///
/// Bytes without a key mapping are skipped. A failed injection is logged and
/// the rest of the output still goes through.
#[derive(Debug)]
pub struct Forwarding<S, K> {
    inner: S,
    keys: K,
}

impl<S: OutputSink, K: KeystrokeSink> Forwarding<S, K> {
    pub fn new(inner: S, keys: K) -> Self {
        Self { inner, keys }
    }

    pub fn into_parts(self) -> (S, K) {
        (self.inner, self.keys)
    }

    fn forward(&mut self, byte: u8) {
        let Some(key) = VirtualKey::from_byte(byte) else {
            return;
        };
        if let Err(e) = self.keys.send(key) {
            warn!("Keystroke for 0x{:02X} not delivered: {}", byte, e);
        }
    }
}

impl<S: OutputSink, K: KeystrokeSink> OutputSink for Forwarding<S, K> {
    fn emit_message(&mut self, message: &Message) {
        self.inner.emit_message(message);
        for &byte in message.body() {
            self.forward(byte);
        }
        self.forward(b'\n');
    }

    fn emit_byte(&mut self, byte: u8) {
        self.inner.emit_byte(byte);
        self.forward(byte);
    }
}
