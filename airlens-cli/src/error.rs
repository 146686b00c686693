//! CLI error type.

use std::path::PathBuf;

use airlens::config::ConfigError;
use airlens::logging::LoggingError;
use airlens::EstimationError;
use thiserror::Error;

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Estimation(#[from] EstimationError),

    #[error("failed to initialise logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(String),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to write output: {0}")]
    Output(String),
}
