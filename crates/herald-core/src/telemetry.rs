//! Centralised tracing initialisation for the `herald` binary.
//!
//! Call [`init_tracing`] once at program start. Logs always go to stderr:
//! stdout carries the protocol response and must stay clean.
//!
//! Safe to call more than once; subsequent calls are silently ignored
//! (the global subscriber can only be set once per process).

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Parse a `log_level` value from the resource configuration.
///
/// Returns `None` for anything other than `trace`, `debug`, `info`, `warn`
/// or `error`.
pub fn parse_log_level(value: &str) -> Option<Level> {
    match value {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialise the global tracing subscriber.
///
/// * `level`: default verbosity when `RUST_LOG` is not set.
/// * `json`: when `true`, emit newline-delimited JSON log lines.
pub fn init_tracing(level: Level, json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .json(),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}
