//! Device discovery by descending index scan
//!
//! Devices are addressed by a small integer index. The locator walks the
//! range from the highest index down and keeps the first device that opens
//! for both reading and writing. Higher indices are usually virtual or
//! transient ports, so scanning downward settles on physical hardware.

use std::io;

use tracing::{debug, info};

use crate::channel::{Channel, ChannelPair};
use crate::error::LinkError;

/// Inclusive index range, scanned from `max` down to `min`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    max: u32,
    min: u32,
}

impl ScanRange {
    /// Highest index scanned by default
    pub const DEFAULT_MAX: u32 = 30;

    /// Lowest index scanned by default (COM ports start at 1)
    #[cfg(windows)]
    pub const DEFAULT_MIN: u32 = 1;
    /// Lowest index scanned by default
    #[cfg(not(windows))]
    pub const DEFAULT_MIN: u32 = 0;

    pub fn new(max: u32, min: u32) -> Self {
        Self { max, min }
    }

    /// Range holding only `index`
    pub fn single(index: u32) -> Self {
        Self {
            max: index,
            min: index,
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn contains(&self, index: u32) -> bool {
        (self.min..=self.max).contains(&index)
    }

    /// Indices in scan order; empty when `min > max`
    pub fn indices(&self) -> impl Iterator<Item = u32> {
        (self.min..=self.max).rev()
    }
}

impl Default for ScanRange {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX, Self::DEFAULT_MIN)
    }
}

/// Opens device handles by index
pub trait DeviceOpener {
    type Channel: Channel;

    /// Name of the device at `index`
    fn device_name(&self, index: u32) -> String;

    /// Open one exclusive handle to the device at `index`
    fn open(&mut self, index: u32) -> io::Result<Self::Channel>;
}

/// Finds the first usable device in a [`ScanRange`]
pub struct DeviceLocator<O> {
    opener: O,
    range: ScanRange,
}

impl<O: DeviceOpener> DeviceLocator<O> {
    pub fn new(opener: O, range: ScanRange) -> Self {
        Self { opener, range }
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Scan the range and return the first device open in both directions
    ///
    /// A device that opens for reading but cannot provide a write handle is
    /// closed again before moving on.
    pub fn locate(&mut self) -> Result<ChannelPair<O::Channel>, LinkError> {
        for index in self.range.indices() {
            let name = self.opener.device_name(index);
            debug!("Trying {}...", name);

            match self.open_pair(index) {
                Ok(pair) => {
                    info!("Opened {} (index {})", name, index);
                    return Ok(pair);
                }
                Err(e) => debug!("{} unavailable: {}", name, e),
            }
        }

        Err(LinkError::DeviceUnavailable {
            max: self.range.max,
            min: self.range.min,
        })
    }

    fn open_pair(&mut self, index: u32) -> io::Result<ChannelPair<O::Channel>> {
        let reader = self.opener.open(index)?;
        let writer = reader.try_clone()?;
        Ok(ChannelPair::new(index, reader, writer))
    }
}
