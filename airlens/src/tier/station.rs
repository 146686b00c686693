//! Station tier: inverse-distance-weighted interpolation.
//!
//! # Algorithm
//!
//! ```text
//! d_i  = haversine(query, station_i)            (km)
//! w_i  = 1 / (d_i + ε)²                         (ε = 0.1 km)
//! pm25 = Σ w_i·v_i / Σ w_i
//! conf = min(0.9, 1 / (1 + d_nearest / 10))
//! ```
//!
//! The ε term keeps the weight finite when the query sits on a station, so a
//! co-located station dominates rather than dividing by zero.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TierResult, TierSource};
use crate::coord::GeoPoint;
use crate::error::{EstimationError, EstimationResult};

/// Default search radius around the query point (km).
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 50.0;

/// Default distance softening term (km).
pub const DEFAULT_EPSILON_KM: f64 = 0.1;

/// Default number of nearest stations that contribute.
pub const DEFAULT_MAX_STATIONS: usize = 10;

/// A ground station's PM2.5 reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReading {
    /// Station location.
    pub coordinate: GeoPoint,
    /// Measured PM2.5 in µg/m³.
    pub pm25: f64,
    /// Optional display name, used only in diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StationReading {
    /// Creates an unnamed reading.
    pub fn new(coordinate: GeoPoint, pm25: f64) -> Self {
        Self {
            coordinate,
            pm25,
            name: None,
        }
    }

    /// Attaches a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn validate(&self) -> EstimationResult<()> {
        self.coordinate.validate()?;
        if !self.pm25.is_finite() || self.pm25 < 0.0 {
            return Err(EstimationError::invalid(format!(
                "station {} has invalid PM2.5 reading {}",
                self.name.as_deref().unwrap_or("<unnamed>"),
                self.pm25
            )));
        }
        Ok(())
    }
}

/// Tuning for the station tier.
#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    /// Readings farther than this are ignored (km).
    pub search_radius_km: f64,

    /// Softening term added to every distance (km).
    pub epsilon_km: f64,

    /// Only the nearest N readings contribute.
    pub max_stations: usize,

    /// Upper bound on the tier's confidence.
    pub max_confidence: f64,

    /// Distance at which confidence halves relative to a co-located station (km).
    pub confidence_scale_km: f64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            epsilon_km: DEFAULT_EPSILON_KM,
            max_stations: DEFAULT_MAX_STATIONS,
            max_confidence: 0.9,
            confidence_scale_km: 10.0,
        }
    }
}

impl StationConfig {
    /// Set the search radius.
    pub fn with_search_radius_km(mut self, km: f64) -> Self {
        self.search_radius_km = km;
        self
    }

    /// Set the maximum number of contributing stations.
    pub fn with_max_stations(mut self, n: usize) -> Self {
        self.max_stations = n;
        self
    }

    /// Checks that every parameter is usable.
    pub fn validate(&self) -> EstimationResult<()> {
        if !(self.search_radius_km > 0.0) {
            return Err(EstimationError::Config(format!(
                "station search radius must be positive, got {}",
                self.search_radius_km
            )));
        }
        if !(self.epsilon_km > 0.0) {
            return Err(EstimationError::Config(format!(
                "station epsilon must be positive, got {}",
                self.epsilon_km
            )));
        }
        if self.max_stations == 0 {
            return Err(EstimationError::Config(
                "station max_stations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_confidence) {
            return Err(EstimationError::Config(format!(
                "station max confidence must be in [0, 1], got {}",
                self.max_confidence
            )));
        }
        if !(self.confidence_scale_km > 0.0) {
            return Err(EstimationError::Config(format!(
                "station confidence scale must be positive, got {}",
                self.confidence_scale_km
            )));
        }
        Ok(())
    }
}

/// IDW estimator over nearby station readings.
#[derive(Debug, Clone, Default)]
pub struct StationEstimator {
    config: StationConfig,
}

impl StationEstimator {
    /// Creates an estimator with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `config` fails [`StationConfig::validate`].
    pub fn new(config: StationConfig) -> EstimationResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Interpolates PM2.5 at `query` from `readings`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(result))` when at least one reading lies within the search radius
    /// - `Ok(None)` when the list is empty or every reading is out of range;
    ///   the tier is unavailable, not zero-confidence
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an invalid query point or a malformed reading.
    pub fn estimate(
        &self,
        query: GeoPoint,
        readings: &[StationReading],
    ) -> EstimationResult<Option<TierResult>> {
        query.validate()?;

        let mut in_range = Vec::with_capacity(readings.len());
        for reading in readings {
            reading.validate()?;
            let distance = query.distance_km(&reading.coordinate);
            if distance <= self.config.search_radius_km {
                in_range.push((distance, reading.pm25));
            }
        }

        if in_range.is_empty() {
            debug!(
                query = %query,
                supplied = readings.len(),
                radius_km = self.config.search_radius_km,
                "No stations in range"
            );
            return Ok(None);
        }

        in_range.sort_by(|a, b| a.0.total_cmp(&b.0));
        in_range.truncate(self.config.max_stations);

        let Some((value, nearest_km)) = self.interpolate(&in_range) else {
            return Ok(None);
        };
        let confidence = self.confidence_for(nearest_km);

        debug!(
            query = %query,
            stations = in_range.len(),
            nearest_km,
            value,
            confidence,
            "Station IDW interpolation"
        );

        TierResult::new(TierSource::Station, value, confidence).map(Some)
    }

    /// IDW over `(distance_km, value)` pairs sorted nearest-first.
    ///
    /// Returns the interpolated value and the nearest distance, or `None`
    /// for an empty slice.
    fn interpolate(&self, stations: &[(f64, f64)]) -> Option<(f64, f64)> {
        let &(nearest_km, _) = stations.first()?;
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for &(distance, value) in stations {
            let weight = 1.0 / (distance + self.config.epsilon_km).powi(2);
            weighted_sum += weight * value;
            total_weight += weight;
        }

        Some((weighted_sum / total_weight, nearest_km))
    }

    /// Confidence from the nearest station distance.
    pub fn confidence_for(&self, nearest_km: f64) -> f64 {
        let raw = 1.0 / (1.0 + nearest_km / self.config.confidence_scale_km);
        raw.min(self.config.max_confidence)
    }
}
