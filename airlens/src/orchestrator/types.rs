//! Request, outcome and report types for the orchestrator.

use std::fmt;
use std::time::Duration;

use image::RgbImage;
use serde::Serialize;

use crate::coord::GeoPoint;
use crate::error::{EstimationError, EstimationResult};
use crate::fusion::FusedEstimate;
use crate::tier::{AerosolObservation, TierResult, TierSource};

/// Default station tier deadline.
pub const DEFAULT_STATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default camera tier deadline.
pub const DEFAULT_CAMERA_TIMEOUT: Duration = Duration::from_secs(10);

/// Default satellite tier deadline.
pub const DEFAULT_SATELLITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-tier deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierTimeouts {
    /// Deadline for the station fetch and interpolation.
    pub station: Duration,
    /// Deadline for feature extraction and the camera model.
    pub camera: Duration,
    /// Deadline for the aerosol fetch and conversion.
    pub satellite: Duration,
}

impl Default for TierTimeouts {
    fn default() -> Self {
        Self {
            station: DEFAULT_STATION_TIMEOUT,
            camera: DEFAULT_CAMERA_TIMEOUT,
            satellite: DEFAULT_SATELLITE_TIMEOUT,
        }
    }
}

impl TierTimeouts {
    /// Same deadline for every tier.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            station: timeout,
            camera: timeout,
            satellite: timeout,
        }
    }

    /// Set the station deadline.
    pub fn with_station(mut self, timeout: Duration) -> Self {
        self.station = timeout;
        self
    }

    /// Set the camera deadline.
    pub fn with_camera(mut self, timeout: Duration) -> Self {
        self.camera = timeout;
        self
    }

    /// Set the satellite deadline.
    pub fn with_satellite(mut self, timeout: Duration) -> Self {
        self.satellite = timeout;
        self
    }

    /// Deadline for `source`.
    pub fn for_tier(&self, source: TierSource) -> Duration {
        match source {
            TierSource::Station => self.station,
            TierSource::Camera => self.camera,
            TierSource::Satellite => self.satellite,
        }
    }

    /// Rejects zero deadlines.
    pub fn validate(&self) -> EstimationResult<()> {
        for source in TierSource::ALL {
            if self.for_tier(source).is_zero() {
                return Err(EstimationError::Config(format!(
                    "{} timeout must be greater than zero",
                    source
                )));
            }
        }
        Ok(())
    }
}

/// Why a tier produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The caller supplied nothing for this tier.
    NoInput,
    /// No station reading fell inside the search radius.
    NoStations,
    /// The tier's input was malformed.
    InvalidInput(String),
    /// The external data source failed.
    SourceFailed(String),
    /// The tier missed its deadline.
    TimedOut,
    /// The request was cancelled before the tier finished.
    Cancelled,
}

impl UnavailableReason {
    /// Maps a tier error onto an unavailability reason.
    pub fn from_error(error: EstimationError) -> Self {
        match error {
            EstimationError::InvalidInput(message) => UnavailableReason::InvalidInput(message),
            other => UnavailableReason::SourceFailed(other.to_string()),
        }
    }

    /// True for reasons that indicate something went wrong, as opposed to
    /// the tier simply having nothing to work with.
    pub fn is_failure(&self) -> bool {
        !matches!(self, UnavailableReason::NoInput | UnavailableReason::NoStations)
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::NoInput => f.write_str("no input"),
            UnavailableReason::NoStations => f.write_str("no stations in range"),
            UnavailableReason::InvalidInput(m) => write!(f, "invalid input: {}", m),
            UnavailableReason::SourceFailed(m) => write!(f, "source failed: {}", m),
            UnavailableReason::TimedOut => f.write_str("timed out"),
            UnavailableReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// What one tier produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TierOutcome {
    /// The tier produced an estimate.
    Available(TierResult),
    /// The tier produced nothing.
    Unavailable(UnavailableReason),
}

impl TierOutcome {
    /// Shorthand for an unavailable outcome.
    pub fn unavailable(reason: UnavailableReason) -> Self {
        TierOutcome::Unavailable(reason)
    }

    /// The result, if available.
    pub fn result(&self) -> Option<&TierResult> {
        match self {
            TierOutcome::Available(result) => Some(result),
            TierOutcome::Unavailable(_) => None,
        }
    }

    /// The reason, if unavailable.
    pub fn reason(&self) -> Option<&UnavailableReason> {
        match self {
            TierOutcome::Available(_) => None,
            TierOutcome::Unavailable(reason) => Some(reason),
        }
    }

    /// True when the tier produced a result.
    pub fn is_available(&self) -> bool {
        matches!(self, TierOutcome::Available(_))
    }
}

impl From<EstimationResult<TierResult>> for TierOutcome {
    fn from(result: EstimationResult<TierResult>) -> Self {
        match result {
            Ok(r) => TierOutcome::Available(r),
            Err(e) => TierOutcome::Unavailable(UnavailableReason::from_error(e)),
        }
    }
}

/// Inputs for one estimation.
///
/// Every field is optional; a tier with no input is reported unavailable.
#[derive(Debug, Clone, Default)]
pub struct EstimationRequest {
    /// Query location for the station and atmosphere sources.
    pub location: Option<GeoPoint>,
    /// Sky photograph for the camera tier.
    pub image: Option<RgbImage>,
    /// Aerosol observation already held by the caller. Takes precedence over
    /// the orchestrator's atmosphere source.
    pub aerosol: Option<AerosolObservation>,
}

impl EstimationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query location.
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the sky photograph.
    pub fn with_image(mut self, image: RgbImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Set an aerosol observation directly.
    pub fn with_aerosol(mut self, aerosol: AerosolObservation) -> Self {
        self.aerosol = Some(aerosol);
        self
    }
}

/// Everything one estimation produced.
///
/// Tier outcomes are kept even when fusion fails, so a caller can still
/// show why each tier was missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimationReport {
    /// Station tier outcome.
    pub station: TierOutcome,
    /// Camera tier outcome.
    pub camera: TierOutcome,
    /// Satellite tier outcome.
    pub satellite: TierOutcome,
    /// Fused estimate, or `NoUsableData` when every tier was unavailable.
    pub fused: Result<FusedEstimate, EstimationError>,
}

impl EstimationReport {
    /// Outcome for `source`.
    pub fn outcome(&self, source: TierSource) -> &TierOutcome {
        match source {
            TierSource::Station => &self.station,
            TierSource::Camera => &self.camera,
            TierSource::Satellite => &self.satellite,
        }
    }

    /// All outcomes in reporting order.
    pub fn outcomes(&self) -> impl Iterator<Item = (TierSource, &TierOutcome)> {
        TierSource::ALL
            .into_iter()
            .map(move |source| (source, self.outcome(source)))
    }

    /// The fused estimate, if fusion succeeded.
    pub fn estimate(&self) -> Option<&FusedEstimate> {
        self.fused.as_ref().ok()
    }
}
