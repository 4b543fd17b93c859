//! Byte channel abstraction
//!
//! A [`Channel`] is one open handle to a device. A located device is held as
//! a [`ChannelPair`]: a read-direction handle and a write-direction handle to
//! the same physical port. Dropping the pair closes whatever is still open.

use std::fmt;
use std::io;

use tracing::info;

use crate::config::LinkConfiguration;
use crate::error::LinkError;

/// Transfer direction of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

/// An open handle to a byte-oriented device
///
/// Closing is tied to `Drop`.
pub trait Channel: Sized {
    /// Device name used in logs and errors
    fn name(&self) -> &str;

    /// Read up to `buf.len()` bytes
    ///
    /// Blocks for at most the configured timeout. `Ok(0)` means nothing
    /// arrived in time; it is not end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `data`
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Apply link parameters to this handle
    fn configure(&mut self, config: &LinkConfiguration, direction: Direction) -> io::Result<()>;

    /// Open a second handle to the same device
    fn try_clone(&self) -> io::Result<Self>;

    /// Read a single byte, `None` on timeout
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }
}

/// Read and write handles to one located device
pub struct ChannelPair<C: Channel> {
    index: u32,
    reader: C,
    writer: Option<C>,
}

impl<C: Channel> ChannelPair<C> {
    pub fn new(index: u32, reader: C, writer: C) -> Self {
        Self {
            index,
            reader,
            writer: Some(writer),
        }
    }

    /// Index the device was found at
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        self.reader.name()
    }

    pub fn reader_mut(&mut self) -> &mut C {
        &mut self.reader
    }

    /// The write handle, if it has not been released
    pub fn writer_mut(&mut self) -> Option<&mut C> {
        self.writer.as_mut()
    }

    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    /// Send the initial handshake bytes on the write handle
    pub fn handshake(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        let device = self.name().to_string();
        let writer = self.writer.as_mut().ok_or_else(|| LinkError::HandshakeFailed {
            device: device.clone(),
            source: io::Error::new(io::ErrorKind::NotConnected, "write handle already closed"),
        })?;

        writer
            .write_all(payload)
            .map_err(|source| LinkError::HandshakeFailed { device, source })?;
        info!("{} bytes written to {}", payload.len(), self.reader.name());
        Ok(())
    }

    /// Close the write handle; later calls are no-ops
    pub fn release_writer(&mut self) {
        if let Some(writer) = self.writer.take() {
            info!("Closing write handle on {}", writer.name());
            drop(writer);
        }
    }
}

impl<C: Channel> Drop for ChannelPair<C> {
    fn drop(&mut self) {
        self.release_writer();
        info!("Closing read handle on {}", self.reader.name());
    }
}

impl<C: Channel> fmt::Debug for ChannelPair<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPair")
            .field("index", &self.index)
            .field("name", &self.reader.name())
            .field("writer_open", &self.writer.is_some())
            .finish()
    }
}
