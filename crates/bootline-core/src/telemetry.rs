//! Centralised tracing initialisation for bootline binaries.
//!
//! Call [`init_tracing`] once at program start, before the bootstrap runs,
//! so every diagnostic the bootstrap emits has somewhere to go.
//!
//! Safe to call more than once. The global subscriber can only be set once
//! per process, later calls are silently ignored.

use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{BootConfig, LogFormat};

/// Initialise the global tracing subscriber from a [`BootConfig`].
///
/// The filter directive comes from `config.log_filter`; without one the
/// default level is DEBUG in debug mode and INFO otherwise.
/// Log lines go to stderr so command output on stdout stays clean.
pub fn init_tracing(config: &BootConfig) {
    let default_level = if config.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing_with(config.log_format, config.log_filter.as_deref(), default_level);
}

/// Initialise the global tracing subscriber with explicit settings.
pub fn init_tracing_with(format: LogFormat, filter: Option<&str>, level: Level) {
    let env_filter = filter
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(level.as_str()));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
                .try_init()
                .ok();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(std::io::stderr().is_terminal())
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .ok();
        }
    }
}

/// Turn on unbounded backtrace capture for the rest of the process.
///
/// Only touches variables the user has not already set. Must run while the
/// process is still single-threaded; the binary calls it first thing on a
/// current-thread runtime.
pub fn enable_debug_backtraces() {
    for (key, value) in [("RUST_BACKTRACE", "full"), ("RUST_LIB_BACKTRACE", "1")] {
        if std::env::var_os(key).is_none() {
            std::env::set_var(key, value);
        }
    }
}
