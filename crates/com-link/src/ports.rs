//! Present ports matched against the scan
//!
//! Lists the serial ports the OS reports and, for each one, the device index
//! it stands for under a [`DeviceTemplate`] and whether the locator would
//! try it. Entries come back in the order a scan would reach them.

use std::fmt;

use serialport::{available_ports, SerialPortInfo, SerialPortType};
use tracing::debug;

use crate::error::LinkError;
use crate::locator::ScanRange;
use crate::serial::DeviceTemplate;

/// USB adapter identity, when the OS reports one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbIdentity {
    pub vid: u16,
    pub pid: u16,
    pub product: Option<String>,
}

/// How a present port relates to the scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPosition {
    /// Inside the range; the locator will try it
    Scanned(u32),
    /// Matches the template but lies outside the range
    OutOfRange(u32),
    /// Not named by the template at all
    Unmatched,
}

/// A port the OS reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    pub name: String,
    pub position: ScanPosition,
    pub usb: Option<UsbIdentity>,
}

impl PortEntry {
    fn classify(port: SerialPortInfo, template: &DeviceTemplate, range: ScanRange) -> Self {
        let position = match template.index_of(&port.port_name) {
            Some(index) if range.contains(index) => ScanPosition::Scanned(index),
            Some(index) => ScanPosition::OutOfRange(index),
            None => ScanPosition::Unmatched,
        };
        let usb = match port.port_type {
            SerialPortType::UsbPort(info) => Some(UsbIdentity {
                vid: info.vid,
                pid: info.pid,
                product: info.product,
            }),
            _ => None,
        };

        Self {
            name: port.port_name,
            position,
            usb,
        }
    }
}

impl fmt::Display for PortEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<16}", self.name)?;
        match self.position {
            ScanPosition::Scanned(index) => write!(f, " index {:<3} scanned", index)?,
            ScanPosition::OutOfRange(index) => write!(f, " index {:<3} outside range", index)?,
            ScanPosition::Unmatched => write!(f, " not a scan candidate")?,
        }
        if let Some(usb) = &self.usb {
            write!(f, " [{:04X}:{:04X}]", usb.vid, usb.pid)?;
            if let Some(product) = &usb.product {
                write!(f, " {}", product)?;
            }
        }
        Ok(())
    }
}

/// Order entries the way a scan reaches them
///
/// Scanned ports come first by descending index, then ports outside the
/// range, then everything the template does not name.
fn scan_order(mut entries: Vec<PortEntry>) -> Vec<PortEntry> {
    entries.sort_by(|a, b| {
        let rank = |e: &PortEntry| match e.position {
            ScanPosition::Scanned(index) => (0, u32::MAX - index),
            ScanPosition::OutOfRange(index) => (1, u32::MAX - index),
            ScanPosition::Unmatched => (2, 0),
        };
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });
    entries
}

/// Match the OS port list against `template` and `range`
pub fn list_ports(template: &DeviceTemplate, range: ScanRange) -> Result<Vec<PortEntry>, LinkError> {
    let ports = available_ports().map_err(|e| LinkError::EnumerationFailed(e.to_string()))?;
    debug!("OS reports {} serial port(s)", ports.len());

    Ok(classify_all(ports, template, range))
}

fn classify_all(
    ports: Vec<SerialPortInfo>,
    template: &DeviceTemplate,
    range: ScanRange,
) -> Vec<PortEntry> {
    scan_order(
        ports
            .into_iter()
            .map(|port| PortEntry::classify(port, template, range))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn port(name: &str, port_type: SerialPortType) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type,
        }
    }

    fn usb(product: &str) -> SerialPortType {
        SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x067B,
            pid: 0x2303,
            serial_number: None,
            manufacturer: None,
            product: Some(product.to_string()),
        })
    }

    #[test]
    fn test_entries_follow_scan_order() {
        let template = DeviceTemplate::new("/dev/ttyUSB{}");
        let ports = vec![
            port("/dev/ttyUSB1", SerialPortType::Unknown),
            port("/dev/ttyS0", SerialPortType::PciPort),
            port("/dev/ttyUSB40", SerialPortType::Unknown),
            port("/dev/ttyUSB7", usb("Printer bridge")),
        ];

        let entries = classify_all(ports, &template, ScanRange::new(30, 0));
        let positions: Vec<_> = entries.iter().map(|e| e.position).collect();

        assert_eq!(
            positions,
            vec![
                ScanPosition::Scanned(7),
                ScanPosition::Scanned(1),
                ScanPosition::OutOfRange(40),
                ScanPosition::Unmatched,
            ]
        );
        assert_eq!(entries[0].usb.as_ref().map(|u| u.pid), Some(0x2303));
    }

    #[test]
    fn test_single_index_range() {
        let template = DeviceTemplate::new(r"\\.\COM{}");
        let ports = vec![port("COM3", SerialPortType::Unknown), port("COM22", SerialPortType::Unknown)];

        let entries = classify_all(ports, &template, ScanRange::single(22));
        assert_eq!(entries[0].position, ScanPosition::Scanned(22));
        assert_eq!(entries[1].position, ScanPosition::OutOfRange(3));
    }

    #[test]
    fn test_display() {
        let template = DeviceTemplate::new("/dev/ttyUSB{}");
        let range = ScanRange::new(30, 0);

        let scanned = PortEntry::classify(port("/dev/ttyUSB2", usb("Printer bridge")), &template, range);
        let text = scanned.to_string();
        assert!(text.starts_with("/dev/ttyUSB2"));
        assert!(text.contains("index 2"));
        assert!(text.contains("scanned"));
        assert!(text.ends_with("[067B:2303] Printer bridge"));

        let other = PortEntry::classify(port("/dev/ttyAMA0", SerialPortType::Unknown), &template, range);
        assert!(other.to_string().ends_with("not a scan candidate"));
    }
}
