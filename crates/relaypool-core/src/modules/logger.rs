//! Logging setup.
//!
//! Installs a `tracing` subscriber with an env-driven filter, a console (stderr) layer
//! and an optional daily rolling file.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "relaypool.log";

/// Initialize global logging.
///
/// `RUST_LOG` overrides `default_level`. When `log_dir` is given, output is
/// mirrored into a daily rotated file; keep the returned guard alive for the
/// lifetime of the process or buffered lines are lost.
pub fn init_logger(default_level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| format!("Invalid log filter '{}': {}", default_level, e))?;

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(file_layer)
                .try_init()
                .map_err(|e| format!("Failed to install logger: {}", e))?;
            Ok(Some(guard))
        },
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .try_init()
                .map_err(|e| format!("Failed to install logger: {}", e))?;
            Ok(None)
        },
    }
}
