//! Diagnostic logging setup
//!
//! Diagnostics go to stderr so stdout carries nothing but decoded output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Verbosity;

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "comprinter=info,com_link=info,com_frame=info",
        Verbosity::Debug => "comprinter=debug,com_link=debug,com_frame=debug",
    }
}

pub fn init(verbosity: Verbosity) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbosity).into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
