//! A located, configured device ready to monitor

use std::sync::atomic::{AtomicBool, Ordering};

use com_frame::{Decoder, ParserStats};
use com_link::{
    Channel, ChannelPair, DeviceLocator, DeviceOpener, LinkConfiguration, LinkConfigurator,
    LinkError,
};
use tracing::{debug, info};

use crate::monitor;
use crate::sink::OutputSink;

/// Owns both handles of the active device until it is dropped
#[derive(Debug)]
pub struct Session<C: Channel> {
    pair: ChannelPair<C>,
    link: LinkConfiguration,
}

impl<C: Channel> Session<C> {
    /// Locate a device and configure both of its handles
    ///
    /// If configuration fails the located handles are closed before the
    /// error is returned.
    pub fn open<O>(
        locator: &mut DeviceLocator<O>,
        configurator: &LinkConfigurator,
    ) -> Result<Self, LinkError>
    where
        O: DeviceOpener<Channel = C>,
    {
        let mut pair = locator.locate()?;
        let link = configurator.apply(&mut pair)?;
        info!(
            "Configured {} at {} baud, 8N1",
            pair.name(),
            link.baud_rate()
        );
        Ok(Self { pair, link })
    }

    /// Write the handshake and close the write handle
    ///
    /// The write handle is released whether or not the write succeeds. An
    /// empty payload skips the write, and so does a shutdown requested while
    /// the link was being set up.
    pub fn handshake(&mut self, payload: &[u8], shutdown: &AtomicBool) -> Result<(), LinkError> {
        let result = if shutdown.load(Ordering::SeqCst) {
            info!("Shutdown requested, skipping handshake on {}", self.pair.name());
            Ok(())
        } else if payload.is_empty() {
            debug!("Handshake disabled");
            Ok(())
        } else {
            self.pair.handshake(payload)
        };
        self.pair.release_writer();
        result
    }

    /// Monitor the read handle until `shutdown` is raised
    pub fn run<S: OutputSink>(
        &mut self,
        decoder: &mut Decoder,
        sink: &mut S,
        shutdown: &AtomicBool,
    ) -> ParserStats {
        let backoff = self.link.timeouts().read_interval;
        monitor::run(self.pair.reader_mut(), decoder, sink, shutdown, backoff)
    }

    pub fn index(&self) -> u32 {
        self.pair.index()
    }

    pub fn name(&self) -> &str {
        self.pair.name()
    }

    pub fn link(&self) -> &LinkConfiguration {
        &self.link
    }

    pub fn has_writer(&self) -> bool {
        self.pair.has_writer()
    }
}
