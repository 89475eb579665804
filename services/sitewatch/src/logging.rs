//! Console and daily-rolling file logging

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::SitewatchError;

/// Log file name prefix; files are named `monitor.<date>.log`
pub const LOG_FILE_PREFIX: &str = "monitor";

/// Map a configured level name onto a tracing filter directive
///
/// Accepts the usual names case-insensitively plus `WARNING` and `CRITICAL`.
/// Anything unrecognised falls back to `info`.
pub fn filter_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Install the global subscriber writing to the console and to `log_dir`
///
/// `RUST_LOG`, when set, takes precedence over `level`.
///
/// The returned guard flushes the file writer on drop; keep it alive for the whole run.
pub fn init_logging(level: &str, log_dir: &Path) -> crate::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| {
            SitewatchError::Config(format!("Failed to open log directory {:?}: {}", log_dir, e))
        })?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(true))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| SitewatchError::Config(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}
