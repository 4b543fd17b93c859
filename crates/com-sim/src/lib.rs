//! Serial Device Simulation Library
//!
//! This crate provides in-memory stand-ins for serial hardware so device
//! discovery, link configuration and the decode loop can be tested without a
//! physical port. It includes:
//!
//! - **VirtualDevice**: a scripted device that records every write, every
//!   applied configuration and every open/close of its handles
//! - **VirtualBus**: a [`com_link::DeviceOpener`] mapping indices to devices
//!
//! # Example
//!
//! ```rust
//! use com_link::{DeviceLocator, ScanRange};
//! use com_sim::{VirtualBus, VirtualDevice};
//!
//! let device = VirtualDevice::new("sim2").with_input(b"<1@hi>");
//! let bus = VirtualBus::new().with_device(2, device.clone());
//!
//! let mut locator = DeviceLocator::new(bus, ScanRange::new(5, 1));
//! let pair = locator.locate().unwrap();
//!
//! assert_eq!(pair.index(), 2);
//! assert_eq!(device.open_handles(), 2);
//! ```

pub mod bus;
pub mod device;

pub use bus::VirtualBus;
pub use device::{VirtualDevice, VirtualPort};
