//! Index-addressed collection of virtual devices

use std::collections::BTreeMap;
use std::io;

use com_link::DeviceOpener;

use crate::device::{VirtualDevice, VirtualPort};

/// A [`DeviceOpener`] over [`VirtualDevice`]s
///
/// Indices without a device fail to open with `NotFound`; busy devices fail
/// with `PermissionDenied`. Every open attempt is recorded.
#[derive(Debug, Clone, Default)]
pub struct VirtualBus {
    devices: BTreeMap<u32, VirtualDevice>,
    attempts: Vec<u32>,
}

impl VirtualBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, index: u32, device: VirtualDevice) -> Self {
        self.devices.insert(index, device);
        self
    }

    /// Indices passed to `open`, in call order
    pub fn attempts(&self) -> &[u32] {
        &self.attempts
    }

    /// Open handles across every device on the bus
    pub fn open_handles(&self) -> usize {
        self.devices.values().map(VirtualDevice::open_handles).sum()
    }
}

impl DeviceOpener for VirtualBus {
    type Channel = VirtualPort;

    fn device_name(&self, index: u32) -> String {
        match self.devices.get(&index) {
            Some(device) => device.name(),
            None => format!("sim{}", index),
        }
    }

    fn open(&mut self, index: u32) -> io::Result<VirtualPort> {
        self.attempts.push(index);
        match self.devices.get(&index) {
            Some(device) if device.is_busy() => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "device busy",
            )),
            Some(device) => Ok(device.open()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such device")),
        }
    }
}
