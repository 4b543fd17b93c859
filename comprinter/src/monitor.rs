//! Receive loop
//!
//! Reads one byte at a time from the configured channel, feeds it to the
//! decoder and hands any output to the sink. The loop only ends when the
//! shutdown flag is raised.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use com_frame::{Decoded, Decoder, ParserStats};
use com_link::Channel;
use tracing::{debug, info, warn};

use crate::sink::OutputSink;

pub fn run<C, S>(
    channel: &mut C,
    decoder: &mut Decoder,
    sink: &mut S,
    shutdown: &AtomicBool,
    error_backoff: Duration,
) -> ParserStats
where
    C: Channel,
    S: OutputSink,
{
    debug!("Monitoring {} in {} mode", channel.name(), decoder.mode().name());

    let mut failures = FailureRun::default();

    while !shutdown.load(Ordering::SeqCst) {
        let read = match channel.read_byte() {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => None,
            Err(e) => {
                if failures.record() {
                    warn!("Read from {} failed: {}", channel.name(), e);
                } else {
                    debug!("Read from {} still failing: {}", channel.name(), e);
                }
                thread::sleep(error_backoff);
                continue;
            }
        };

        let ended = failures.end();
        if ended > 0 {
            info!("Reads from {} recovered after {} failure(s)", channel.name(), ended);
        }
        let Some(byte) = read else {
            continue;
        };

        match decoder.push_byte(byte) {
            Some(Decoded::Message(message)) => sink.emit_message(&message),
            Some(Decoded::Byte(byte)) => sink.emit_byte(byte),
            None => {}
        }
    }

    decoder.stats()
}

/// Consecutive failed reads; only the first of a run is worth a warning
#[derive(Debug, Default)]
struct FailureRun {
    count: u64,
}

impl FailureRun {
    /// Count a failure; true if it starts a new run
    fn record(&mut self) -> bool {
        self.count += 1;
        self.count == 1
    }

    /// End the run, returning how many failures it held
    fn end(&mut self) -> u64 {
        std::mem::take(&mut self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use com_frame::{DecodeMode, Message};
    use com_sim::VirtualDevice;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Collected {
        messages: Vec<Message>,
        bytes: Vec<u8>,
    }

    impl OutputSink for Collected {
        fn emit_message(&mut self, message: &Message) {
            self.messages.push(message.clone());
        }

        fn emit_byte(&mut self, byte: u8) {
            self.bytes.push(byte);
        }
    }

    fn monitor(device: VirtualDevice, mode: DecodeMode) -> (Collected, ParserStats) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let device = device.stop_when_drained(shutdown.clone());
        let mut port = device.open();
        let mut decoder = Decoder::new(mode);
        let mut sink = Collected::default();

        let stats = run(&mut port, &mut decoder, &mut sink, &shutdown, Duration::ZERO);
        (sink, stats)
    }

    #[test]
    fn test_filtered_messages() {
        let device = VirtualDevice::new("sim1").with_input(b"<12@hi><7@no><12@yo>");
        let (sink, stats) = monitor(device, DecodeMode::Framed { filter: Some(12) });

        let bodies: Vec<_> = sink.messages.iter().map(|m| m.body().to_vec()).collect();
        assert_eq!(bodies, vec![b"hi".to_vec(), b"yo".to_vec()]);
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.filtered, 1);
        assert!(sink.bytes.is_empty());
    }

    #[test]
    fn test_raw_passthrough() {
        let device = VirtualDevice::new("sim1").with_input(b"AB<1@x>");
        let (sink, stats) = monitor(device, DecodeMode::Raw);

        assert_eq!(sink.bytes, b"AB<1@x>");
        assert!(sink.messages.is_empty());
        assert_eq!(stats.bytes, 7);
    }

    #[test]
    fn test_read_errors_do_not_stop_loop() {
        let device = VirtualDevice::new("sim1")
            .with_input(b"<3@ok>")
            .with_read_errors(3);
        let (sink, _) = monitor(device, DecodeMode::Framed { filter: None });

        assert_eq!(sink.messages.len(), 1);
        assert_eq!(sink.messages[0].source_id(), 3);
    }

    #[test]
    fn test_only_first_failure_of_a_run_warns() {
        let mut run = FailureRun::default();
        assert!(run.record());
        assert!(!run.record());
        assert!(!run.record());
        assert_eq!(run.end(), 3);

        assert_eq!(run.end(), 0);
        assert!(run.record());
    }

    #[test]
    fn test_persistent_errors_then_recovery() {
        let device = VirtualDevice::new("sim1")
            .with_input(b"<8@back>")
            .with_read_errors(50);
        let (sink, stats) = monitor(device, DecodeMode::Framed { filter: Some(8) });

        assert_eq!(sink.messages.len(), 1);
        assert_eq!(sink.messages[0].body(), b"back");
        assert_eq!(stats.bytes, 8);
    }

    #[test]
    fn test_raised_flag_stops_before_reading() {
        let device = VirtualDevice::new("sim1").with_input(b"xyz");
        let mut port = device.open();
        let mut decoder = Decoder::new(DecodeMode::Raw);
        let mut sink = Collected::default();

        let stats = run(
            &mut port,
            &mut decoder,
            &mut sink,
            &AtomicBool::new(true),
            Duration::ZERO,
        );

        assert_eq!(stats.bytes, 0);
        assert_eq!(device.remaining_input(), 3);
    }

    proptest! {
        #[test]
        fn raw_output_matches_input(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let device = VirtualDevice::new("sim1").with_input(&data);
            let (sink, stats) = monitor(device, DecodeMode::Raw);

            prop_assert_eq!(sink.bytes, data.clone());
            prop_assert_eq!(stats.bytes, data.len() as u64);
        }
    }
}
