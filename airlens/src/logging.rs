//! Logging setup.
//!
//! Installs a global `tracing` subscriber with:
//!
//! - an `EnvFilter` taken from `RUST_LOG`, or the configured directive when
//!   `RUST_LOG` is unset
//! - a stderr layer with local RFC 3339 timestamps
//! - an optional daily-rotated file under a log directory, written through a
//!   non-blocking worker
//!
//! Keep the returned [`LoggingGuard`] alive until exit or buffered file
//! output is lost.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Prefix of the daily log files.
pub const LOG_FILE_PREFIX: &str = "airlens.log";

/// Errors from installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Flushes the file writer on drop.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    file: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// True when a log file is being written.
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

/// Install the global subscriber.
///
/// `default_filter` applies only when `RUST_LOG` is unset or invalid.
pub fn init_logging(
    default_filter: &str,
    log_dir: Option<&Path>,
) -> Result<LoggingGuard, LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false);

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    tracing::debug!(
        log_dir = ?log_dir,
        "Logging initialised"
    );

    Ok(LoggingGuard { file: file_guard })
}
