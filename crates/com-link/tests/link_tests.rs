//! Integration tests for device discovery and link configuration
//!
//! These tests run the locator and configurator against virtual devices:
//! - Descending scan order and first-success selection
//! - Release of partially opened devices
//! - Identical parameters on both handles of a device
//! - Fatal configuration rejection

use std::time::Duration;

use com_link::{
    Channel, DeviceLocator, Direction, LinkConfiguration, LinkConfigurator, LinkError, ScanRange,
};
use com_sim::{VirtualBus, VirtualDevice};
use proptest::prelude::*;

// ============================================================================
// Locator
// ============================================================================

mod locator {
    use super::*;

    #[test]
    fn selects_first_openable_index_scanning_down() {
        let device = VirtualDevice::new("sim2");
        let bus = VirtualBus::new().with_device(2, device.clone());

        let mut locator = DeviceLocator::new(bus, ScanRange::new(5, 1));
        let pair = locator.locate().unwrap();

        assert_eq!(pair.index(), 2);
        assert_eq!(pair.name(), "sim2");
        assert_eq!(locator.opener().attempts(), &[5, 4, 3, 2]);
        assert_eq!(device.open_handles(), 2);
    }

    #[test]
    fn prefers_highest_index() {
        let low = VirtualDevice::new("low");
        let high = VirtualDevice::new("high");
        let bus = VirtualBus::new()
            .with_device(1, low.clone())
            .with_device(4, high.clone());

        let pair = DeviceLocator::new(bus, ScanRange::new(5, 1)).locate().unwrap();

        assert_eq!(pair.index(), 4);
        assert_eq!(low.opens(), 0);
    }

    #[test]
    fn skips_busy_device() {
        let bus = VirtualBus::new()
            .with_device(3, VirtualDevice::new("busy").busy())
            .with_device(2, VirtualDevice::new("free"));

        let pair = DeviceLocator::new(bus, ScanRange::new(3, 1)).locate().unwrap();
        assert_eq!(pair.index(), 2);
    }

    #[test]
    fn releases_reader_when_writer_unavailable() {
        let half = VirtualDevice::new("half").fail_clone();
        let good = VirtualDevice::new("good");
        let bus = VirtualBus::new()
            .with_device(3, half.clone())
            .with_device(1, good.clone());

        let pair = DeviceLocator::new(bus, ScanRange::new(3, 1)).locate().unwrap();

        assert_eq!(pair.index(), 1);
        assert_eq!(half.opens(), 1);
        assert_eq!(half.closes(), 1);
        assert_eq!(half.open_handles(), 0);
    }

    #[test]
    fn exhausted_range_is_unavailable() {
        let bus = VirtualBus::new().with_device(9, VirtualDevice::new("out-of-range"));
        let mut locator = DeviceLocator::new(bus, ScanRange::new(5, 1));

        match locator.locate() {
            Err(LinkError::DeviceUnavailable { max, min }) => {
                assert_eq!((max, min), (5, 1));
            }
            other => panic!("expected DeviceUnavailable, got {:?}", other),
        }
        assert_eq!(locator.opener().open_handles(), 0);
    }

    #[test]
    fn explicit_index_limits_scan() {
        let bus = VirtualBus::new()
            .with_device(7, VirtualDevice::new("seven"))
            .with_device(3, VirtualDevice::new("three"));

        let mut locator = DeviceLocator::new(bus, ScanRange::single(3));
        let pair = locator.locate().unwrap();

        assert_eq!(pair.index(), 3);
        assert_eq!(locator.opener().attempts(), &[3]);
    }

    #[test]
    fn dropping_pair_closes_everything_once() {
        let device = VirtualDevice::new("sim1");
        let bus = VirtualBus::new().with_device(1, device.clone());

        let mut pair = DeviceLocator::new(bus, ScanRange::single(1)).locate().unwrap();
        pair.release_writer();
        assert_eq!(device.open_handles(), 1);

        drop(pair);
        assert_eq!(device.opens(), 2);
        assert_eq!(device.closes(), 2);
    }
}

// ============================================================================
// Configurator
// ============================================================================

mod configurator {
    use super::*;

    fn located(device: &VirtualDevice) -> com_link::ChannelPair<com_sim::VirtualPort> {
        let bus = VirtualBus::new().with_device(1, device.clone());
        DeviceLocator::new(bus, ScanRange::single(1)).locate().unwrap()
    }

    #[test]
    fn both_handles_get_same_baud_rate() {
        let device = VirtualDevice::new("sim1");
        let mut pair = located(&device);

        let applied = LinkConfigurator::new(LinkConfiguration::new(38400))
            .apply(&mut pair)
            .unwrap();
        assert_eq!(applied.baud_rate(), 38400);

        let records = device.applied();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, Direction::Write);
        assert_eq!(records[1].0, Direction::Read);
        assert_eq!(records[0].1, records[1].1);
        assert_eq!(records[1].1.baud_rate(), 38400);
    }

    #[test]
    fn read_timeout_left_in_effect() {
        let device = VirtualDevice::new("sim1");
        let mut pair = located(&device);

        let applied = LinkConfigurator::new(LinkConfiguration::default())
            .apply(&mut pair)
            .unwrap();

        // Handles share the device timeout, so the read side must win
        assert_eq!(device.applied().last().map(|(d, _)| *d), Some(Direction::Read));
        assert_eq!(device.timeout(), Some(Duration::from_millis(60)));
        assert_eq!(device.timeout(), Some(applied.handle_timeout(Direction::Read)));

        pair.handshake(b"hello").unwrap();
        pair.release_writer();
        assert_eq!(device.timeout(), Some(Duration::from_millis(60)));
    }

    #[test]
    fn read_rejection_is_fatal() {
        let device = VirtualDevice::new("sim1").reject_configuration(Direction::Read);
        let mut pair = located(&device);

        let err = LinkConfigurator::new(LinkConfiguration::default())
            .apply(&mut pair)
            .unwrap_err();
        assert!(matches!(
            err,
            LinkError::ConfigurationRejected {
                direction: Direction::Read,
                ..
            }
        ));
        let records = device.applied();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, Direction::Write);
    }

    #[test]
    fn write_rejection_is_fatal() {
        let device = VirtualDevice::new("sim1").reject_configuration(Direction::Write);
        let mut pair = located(&device);

        let err = LinkConfigurator::new(LinkConfiguration::default())
            .apply(&mut pair)
            .unwrap_err();
        assert!(matches!(
            err,
            LinkError::ConfigurationRejected {
                direction: Direction::Write,
                ..
            }
        ));
        // Read handle never configured after the write side failed
        assert!(device.applied().is_empty());
    }

    #[test]
    fn zero_baud_rejected_before_touching_device() {
        let device = VirtualDevice::new("sim1");
        let mut pair = located(&device);

        assert!(LinkConfigurator::new(LinkConfiguration::new(0))
            .apply(&mut pair)
            .is_err());
        assert!(device.applied().is_empty());
    }

    #[test]
    fn handshake_after_configuration() {
        let device = VirtualDevice::new("sim1").with_input(b"<1@ready>");
        let mut pair = located(&device);

        LinkConfigurator::new(LinkConfiguration::default())
            .apply(&mut pair)
            .unwrap();
        pair.handshake(b"hello").unwrap();
        pair.release_writer();

        assert_eq!(device.written(), b"hello");
        assert_eq!(pair.reader_mut().read_byte().unwrap(), Some(b'<'));
    }

    #[test]
    fn failed_handshake_reported() {
        let device = VirtualDevice::new("sim1").fail_writes();
        let mut pair = located(&device);

        assert!(matches!(
            pair.handshake(b"hello"),
            Err(LinkError::HandshakeFailed { .. })
        ));
    }

    proptest! {
        #[test]
        fn requested_baud_mirrored(baud in 1u32..4_000_000) {
            let device = VirtualDevice::new("sim1");
            let mut pair = located(&device);

            LinkConfigurator::new(LinkConfiguration::new(baud))
                .apply(&mut pair)
                .unwrap();

            let records = device.applied();
            prop_assert_eq!(records.len(), 2);
            prop_assert!(records.iter().all(|(_, c)| c.baud_rate() == baud));
        }
    }
}
