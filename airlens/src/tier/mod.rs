//! Estimation tiers.
//!
//! Each tier is an independent PM2.5 estimator backed by a different kind of
//! evidence:
//!
//! | Tier | Input | Estimator |
//! |------|-------|-----------|
//! | Station | nearby ground readings | [`StationEstimator`] (IDW) |
//! | Camera | sky photograph features | any [`CameraModel`] |
//! | Satellite | aerosol optical depth | [`SatelliteEstimator`] |
//!
//! Every estimator produces a [`TierResult`]. A tier that has nothing to say
//! produces no result at all; there is no "zero confidence" placeholder.

mod camera;
mod satellite;
mod station;

pub use camera::{CameraModel, CameraWeights, HeuristicCameraModel, LinearCameraModel};
pub use satellite::{AerosolObservation, SatelliteConfig, SatelliteEstimator};
pub use station::{StationConfig, StationEstimator, StationReading};

use serde::Serialize;

use crate::error::{EstimationError, EstimationResult};

/// Which tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TierSource {
    /// Ground monitoring stations.
    Station,
    /// Sky photograph.
    Camera,
    /// Satellite aerosol optical depth.
    Satellite,
}

impl TierSource {
    /// All tiers in reporting order.
    pub const ALL: [TierSource; 3] = [TierSource::Station, TierSource::Camera, TierSource::Satellite];

    /// Short lowercase name used in logs and config keys.
    pub fn name(&self) -> &'static str {
        match self {
            TierSource::Station => "station",
            TierSource::Camera => "camera",
            TierSource::Satellite => "satellite",
        }
    }
}

impl std::fmt::Display for TierSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single tier's PM2.5 estimate.
///
/// Constructed only through [`TierResult::new`], which enforces
/// `value >= 0` and `confidence ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierResult {
    source: TierSource,
    value: f64,
    confidence: f64,
}

impl TierResult {
    /// Creates a validated tier result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `value` is negative or non-finite, or if
    /// `confidence` lies outside `[0, 1]`.
    pub fn new(source: TierSource, value: f64, confidence: f64) -> EstimationResult<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(EstimationError::invalid(format!(
                "{} tier value must be a finite non-negative number, got {}",
                source, value
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EstimationError::invalid(format!(
                "{} tier confidence must be in [0, 1], got {}",
                source, confidence
            )));
        }
        Ok(Self {
            source,
            value,
            confidence,
        })
    }

    /// The tier that produced this result.
    pub fn source(&self) -> TierSource {
        self.source
    }

    /// Estimated PM2.5 in µg/m³.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Confidence in `[0, 1]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}
