//! Tracing subscriber setup.
//!
//! Logs go to stderr and, when a log file is configured, also to that file
//! through a non-blocking writer. `RUST_LOG` overrides the configured level.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{MapError, MapResult};

/// Keeps the file writer flushing; hold it until the process exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    file_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Whether a log file is being written.
    pub fn has_file(&self) -> bool {
        self.file_guard.is_some()
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`MapError::Logging`] if the filter is invalid, the log file's
/// folder cannot be created, or a subscriber is already installed.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> MapResult<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| MapError::Logging(format!("invalid log filter '{}': {}", level, e)))?;

    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);

    let (file_layer, file_guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().ok_or_else(|| {
                MapError::Logging(format!("log file path {} has no file name", path.display()))
            })?;
            fs::create_dir_all(dir).map_err(|e| {
                MapError::Logging(format!("cannot create {}: {}", dir.display(), e))
            })?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MapError::Logging(e.to_string()))?;

    Ok(LoggingGuard { file_guard })
}
