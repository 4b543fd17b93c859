//! serialport-backed channel

use std::io::{self, Read, Write};

use serialport::SerialPort;

use crate::channel::{Channel, Direction};
use crate::config::{LinkConfiguration, DEFAULT_BAUD_RATE};
use crate::locator::DeviceOpener;

/// Maps a device index to a port path; `{}` is replaced by the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTemplate(String);

impl DeviceTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// `\\.\COM{}` on Windows, `/dev/ttyUSB{}` elsewhere
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::new(r"\\.\COM{}")
        } else {
            Self::new("/dev/ttyUSB{}")
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Port path for `index`; the index is appended if there is no `{}`
    pub fn device_name(&self, index: u32) -> String {
        if self.0.contains("{}") {
            self.0.replace("{}", &index.to_string())
        } else {
            format!("{}{}", self.0, index)
        }
    }

    /// Index a port name stands for under this template
    ///
    /// Port listings on Windows omit the `\\.\` device namespace prefix,
    /// so a template carrying it also matches the bare name.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        let (prefix, suffix) = self.0.split_once("{}").unwrap_or((self.0.as_str(), ""));
        let bare = prefix.strip_prefix(r"\\.\");

        std::iter::once(prefix)
            .chain(bare)
            .find_map(|prefix| name.strip_prefix(prefix)?.strip_suffix(suffix))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
    }
}

impl Default for DeviceTemplate {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// One handle to a serial port
pub struct SerialChannel {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Open `name` exclusively with the default link parameters
    pub fn open(name: &str) -> io::Result<Self> {
        let port = serialport::new(name, DEFAULT_BAUD_RATE)
            .data_bits(LinkConfiguration::DATA_BITS)
            .stop_bits(LinkConfiguration::STOP_BITS)
            .parity(LinkConfiguration::PARITY)
            .flow_control(LinkConfiguration::FLOW_CONTROL)
            .timeout(LinkConfiguration::default().handle_timeout(Direction::Read))
            .open()?;

        Ok(Self {
            name: name.to_string(),
            port,
        })
    }
}

impl Channel for SerialChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn configure(&mut self, config: &LinkConfiguration, direction: Direction) -> io::Result<()> {
        // serialport exposes one timeout per handle, and on Windows handles
        // cloned from one device share it
        let timeout = config.handle_timeout(direction);

        self.port.set_baud_rate(config.baud_rate())?;
        self.port.set_data_bits(LinkConfiguration::DATA_BITS)?;
        self.port.set_stop_bits(LinkConfiguration::STOP_BITS)?;
        self.port.set_parity(LinkConfiguration::PARITY)?;
        self.port.set_flow_control(LinkConfiguration::FLOW_CONTROL)?;
        self.port.set_timeout(timeout)?;
        Ok(())
    }

    fn try_clone(&self) -> io::Result<Self> {
        let port = self.port.try_clone()?;
        Ok(Self {
            name: self.name.clone(),
            port,
        })
    }
}

/// Opens serial ports named by a [`DeviceTemplate`]
#[derive(Debug, Clone, Default)]
pub struct SerialOpener {
    template: DeviceTemplate,
}

impl SerialOpener {
    pub fn new(template: DeviceTemplate) -> Self {
        Self { template }
    }
}

impl DeviceOpener for SerialOpener {
    type Channel = SerialChannel;

    fn device_name(&self, index: u32) -> String {
        self.template.device_name(index)
    }

    fn open(&mut self, index: u32) -> io::Result<SerialChannel> {
        SerialChannel::open(&self.template.device_name(index))
    }
}
