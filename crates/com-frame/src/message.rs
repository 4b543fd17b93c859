//! Decoded frame payload

use std::borrow::Cow;
use std::fmt;

/// A completed frame body
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    source_id: u32,
    body: Vec<u8>,
    truncated: bool,
}

impl Message {
    /// Create a message from its parts
    pub fn new(source_id: u32, body: Vec<u8>, truncated: bool) -> Self {
        Self {
            source_id,
            body,
            truncated,
        }
    }

    /// Numeric id carried in the frame header
    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    /// Body bytes, without delimiters
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text; invalid UTF-8 is replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// True when the body hit capacity before its terminator
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
