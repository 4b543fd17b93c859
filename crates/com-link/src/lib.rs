//! Serial Link Library
//!
//! This crate acquires and prepares the serial device a monitor reads from:
//!
//! - **Channel**: the byte-stream abstraction every device handle implements
//! - **DeviceLocator**: scans a descending index range and opens the first
//!   device that yields both a read and a write handle
//! - **LinkConfigurator**: applies 8N1 framing, baud rate and timeouts to both
//!   handles of the located device
//!
//! # Example
//!
//! ```rust,no_run
//! use com_link::{DeviceLocator, LinkConfiguration, LinkConfigurator, ScanRange, SerialOpener};
//!
//! let mut locator = DeviceLocator::new(SerialOpener::default(), ScanRange::default());
//! let mut pair = locator.locate().unwrap();
//!
//! LinkConfigurator::new(LinkConfiguration::new(9600))
//!     .apply(&mut pair)
//!     .unwrap();
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod locator;
pub mod ports;
pub mod serial;

pub use channel::{Channel, ChannelPair, Direction};
pub use config::{
    LinkConfiguration, LinkConfigurator, TimeoutPolicy, DEFAULT_BAUD_RATE, WRITE_BUDGET_BYTES,
};
pub use error::LinkError;
pub use locator::{DeviceLocator, DeviceOpener, ScanRange};
pub use ports::{list_ports, PortEntry, ScanPosition, UsbIdentity};
pub use serial::{DeviceTemplate, SerialChannel, SerialOpener};
