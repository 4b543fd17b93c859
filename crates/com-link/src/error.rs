//! Error types for device acquisition and link setup

use std::io;

use thiserror::Error;

use crate::channel::Direction;

/// Errors that can occur while acquiring or preparing a link
///
/// All of these are setup failures; none can occur once decoding has started.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No device in the scan range opened for both directions
    #[error("no serial device available (scanned {max} down to {min})")]
    DeviceUnavailable { max: u32, min: u32 },

    /// A handle refused the framing or timeout parameters
    #[error("{device} rejected {direction} configuration: {reason}")]
    ConfigurationRejected {
        device: String,
        direction: Direction,
        reason: String,
    },

    /// The initial write on the write-direction handle failed
    #[error("handshake write to {device} failed: {source}")]
    HandshakeFailed {
        device: String,
        #[source]
        source: io::Error,
    },

    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),
}
