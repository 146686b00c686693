//! Error types for estimation.
//!
//! Only two kinds ever reach a caller of the estimation API:
//!
//! - [`EstimationError::InvalidInput`] fails a single tier. The orchestrator
//!   converts it into an unavailable tier so other sources still fuse.
//! - [`EstimationError::NoUsableData`] is raised by the fusion engine when no
//!   tier produced a result. It is fatal to the request.
//!
//! An unavailable tier is not an error at all; see
//! [`crate::orchestrator::TierOutcome`].

use serde::Serialize;
use thiserror::Error;

use crate::coord::CoordError;

/// Result type for estimation operations.
pub type EstimationResult<T> = Result<T, EstimationError>;

/// Errors raised by the estimation core.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum EstimationError {
    /// Malformed input at a tier (empty image, negative AOD, NaN coordinate).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Fusion was asked to combine zero usable tiers.
    #[error("no usable data: every estimation tier is unavailable")]
    NoUsableData,

    /// A configuration value violates its constraints.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EstimationError {
    /// Shorthand for an [`EstimationError::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<CoordError> for EstimationError {
    fn from(e: CoordError) -> Self {
        EstimationError::InvalidInput(e.to_string())
    }
}
