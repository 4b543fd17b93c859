//! COM Port Printer
//!
//! Finds the first usable serial device, configures it for 8N1 at the
//! requested baud rate and prints what arrives: either every byte as-is, or
//! the bodies of `<id@body>` frames from one source.

mod cli;
mod keystroke;
mod logging;
mod monitor;
mod session;
mod sink;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use com_frame::{Decoder, ParserStats};
use com_link::{DeviceLocator, LinkConfigurator, SerialOpener};
use tracing::{error, info, warn};

use cli::{Cli, Settings};
use keystroke::SystemKeystrokes;
use session::Session;
use sink::{ConsoleSink, Forwarding};

fn main() -> ExitCode {
    let normalized = cli::normalize_args(std::env::args_os());
    let cli = match Cli::try_parse_from(&normalized.args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    let settings = Settings::from(&cli);

    logging::init(settings.verbosity);
    for arg in &normalized.unrecognized {
        warn!("Unrecognised option: {}", arg);
    }

    if cli.print_config {
        return match serde_json::to_string_pretty(&settings) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Cannot serialize settings: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let result = if cli.list_ports {
        list_ports(&settings)
    } else {
        run(&settings).map(|stats| {
            info!(
                "Stopped after {} bytes: {} frames ({} truncated), {} filtered, {} resyncs",
                stats.bytes, stats.frames, stats.truncated, stats.filtered, stats.resyncs
            );
        })
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print present ports in the order a scan would try them
fn list_ports(settings: &Settings) -> anyhow::Result<()> {
    let template = settings.template();
    let ports = com_link::list_ports(&template, settings.scan_range())?;
    if ports.is_empty() {
        info!("No serial ports reported");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

/// Locate, configure and monitor a device until interrupted
///
/// Every handle is closed before this returns, on success or error.
fn run(settings: &Settings) -> anyhow::Result<ParserStats> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("installing Ctrl-C handler")?;

    info!(
        "Scanning {} down to {} at {} baud, {} mode",
        settings.scan_range().max(),
        settings.scan_range().min(),
        settings.baud_rate,
        settings.mode.name()
    );

    let mut locator = DeviceLocator::new(SerialOpener::new(settings.template()), settings.scan_range());
    let configurator = LinkConfigurator::new(settings.link_config());
    let mut session = Session::open(&mut locator, &configurator).context("setting up serial link")?;
    session
        .handshake(settings.handshake.as_bytes(), &shutdown)
        .context("sending handshake")?;
    if shutdown.load(Ordering::SeqCst) {
        return Ok(ParserStats::default());
    }

    info!(
        "Listening on {} (index {}, {} baud), press Ctrl-C to stop",
        session.name(),
        session.index(),
        session.link().baud_rate()
    );

    let mut decoder = Decoder::new(settings.mode);
    let console = ConsoleSink::stdout();
    let stats = if settings.keystrokes {
        let mut sink = Forwarding::new(console, SystemKeystrokes::new());
        session.run(&mut decoder, &mut sink, &shutdown)
    } else {
        let mut sink = console;
        session.run(&mut decoder, &mut sink, &shutdown)
    };

    info!("Interrupted, closing {}", session.name());
    Ok(stats)
}
