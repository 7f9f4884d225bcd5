//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber writing to stderr, so the
//! test runner keeps stdout to itself. `RUST_LOG`, when set, takes
//! precedence over the configured level.

use crate::config::LoggingConfig;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human readable output
    Compact,
    /// Multi-line human readable output
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl LogFormat {
    /// Parse a format name, falling back to compact
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Parse a log level name, falling back to info for unknown values
pub fn parse_level(value: &str) -> Level {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" | "critical" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber
///
/// Later calls are ignored once a subscriber is installed.
pub fn init(config: &LoggingConfig) {
    let level = parse_level(&config.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match LogFormat::parse(&config.format) {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
