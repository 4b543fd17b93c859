//! Link parameters and their application
//!
//! The link is always 8 data bits, 1 stop bit, no parity. Only the baud rate
//! is chosen by the caller. The same resolved configuration is applied to the
//! read and the write handle, so both directions always run at one baud rate.

use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use tracing::{debug, info};

use crate::channel::{Channel, ChannelPair, Direction};
use crate::error::LinkError;

/// Baud rate used when none is requested
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Bytes a single write is budgeted for when sizing the write timeout
pub const WRITE_BUDGET_BYTES: u32 = 64;

/// Read/write timeout policy
///
/// Totals follow the usual `constant + multiplier * bytes` form. The
/// interval timeout bounds the gap between two bytes of one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub read_interval: Duration,
    pub read_total_constant: Duration,
    pub read_total_multiplier: Duration,
    pub write_total_constant: Duration,
    pub write_total_multiplier: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            read_interval: Duration::from_millis(50),
            read_total_constant: Duration::from_millis(50),
            read_total_multiplier: Duration::from_millis(10),
            write_total_constant: Duration::from_millis(50),
            write_total_multiplier: Duration::from_millis(10),
        }
    }
}

impl TimeoutPolicy {
    /// Longest a read of `bytes` bytes may block
    pub fn read_total(&self, bytes: u32) -> Duration {
        self.read_total_constant + self.read_total_multiplier * bytes
    }

    /// Longest a write of `bytes` bytes may block
    pub fn write_total(&self, bytes: u32) -> Duration {
        self.write_total_constant + self.write_total_multiplier * bytes
    }
}

/// Resolved link parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfiguration {
    baud_rate: u32,
    timeouts: TimeoutPolicy,
}

impl LinkConfiguration {
    pub const DATA_BITS: DataBits = DataBits::Eight;
    pub const STOP_BITS: StopBits = StopBits::One;
    pub const PARITY: Parity = Parity::None;
    pub const FLOW_CONTROL: FlowControl = FlowControl::None;

    /// Configuration with the default timeout policy
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            timeouts: TimeoutPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn timeouts(&self) -> &TimeoutPolicy {
        &self.timeouts
    }

    /// Timeout for a handle that only supports one value
    ///
    /// The read handle polls a single byte per call; the write handle sends
    /// bursts of up to [`WRITE_BUDGET_BYTES`].
    pub fn handle_timeout(&self, direction: Direction) -> Duration {
        match direction {
            Direction::Read => self.timeouts.read_total(1),
            Direction::Write => self.timeouts.write_total(WRITE_BUDGET_BYTES),
        }
    }
}

impl Default for LinkConfiguration {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE)
    }
}

/// Applies one [`LinkConfiguration`] to both handles of a device
#[derive(Debug, Clone)]
pub struct LinkConfigurator {
    config: LinkConfiguration,
}

impl LinkConfigurator {
    pub fn new(config: LinkConfiguration) -> Self {
        Self { config }
    }

    /// Configure the write handle, then the read handle with the same values
    ///
    /// Both handles may share one set of device timeouts (Windows comm
    /// timeouts are per device), so the read handle goes last and its
    /// one-byte poll timeout is the one left in effect. Any rejection is
    /// fatal.
    pub fn apply<C: Channel>(&self, pair: &mut ChannelPair<C>) -> Result<LinkConfiguration, LinkError> {
        let device = pair.name().to_string();

        if self.config.baud_rate == 0 {
            return Err(LinkError::ConfigurationRejected {
                device,
                direction: Direction::Read,
                reason: "baud rate must be non-zero".into(),
            });
        }

        info!("Configuring {} at {} baud (8N1)", device, self.config.baud_rate);

        if let Some(writer) = pair.writer_mut() {
            writer
                .configure(&self.config, Direction::Write)
                .map_err(|e| LinkError::ConfigurationRejected {
                    device: device.clone(),
                    direction: Direction::Write,
                    reason: e.to_string(),
                })?;
            debug!("Write handle on {} configured", device);
        }

        pair.reader_mut()
            .configure(&self.config, Direction::Read)
            .map_err(|e| LinkError::ConfigurationRejected {
                device: device.clone(),
                direction: Direction::Read,
                reason: e.to_string(),
            })?;
        debug!("Read handle on {} configured", device);

        Ok(self.config)
    }
}
