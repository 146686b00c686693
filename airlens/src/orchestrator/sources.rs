//! External data sources for the station and satellite tiers.
//!
//! The traits return boxed futures so they stay dyn-compatible and can be
//! shared as `Arc<dyn StationSource>` across tasks. Network-backed
//! implementations live outside this crate; the static variants here serve
//! callers that already hold the data.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::coord::GeoPoint;
use crate::error::{EstimationError, EstimationResult};
use crate::tier::{AerosolObservation, StationReading};

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors from an external data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The source answered but has nothing for this location.
    #[error("no data available")]
    NoData,

    /// The source could not be reached or returned garbage.
    #[error("{0}")]
    Failed(String),
}

/// Supplies ground station readings around a point.
pub trait StationSource: Send + Sync {
    /// Readings within roughly `radius_km` of `point`.
    ///
    /// The result may include readings slightly outside the radius; the
    /// station estimator filters by exact distance.
    fn nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<StationReading>, SourceError>>;
}

/// Supplies aerosol optical depth and humidity for a point.
pub trait AtmosphereSource: Send + Sync {
    /// The latest retrieval covering `point`, or `NoData` when there is none.
    fn aerosol(&self, point: GeoPoint) -> BoxFuture<'_, Result<AerosolObservation, SourceError>>;
}

/// A fixed list of station readings.
///
/// Selects readings inside the search radius's bounding box, the way a
/// station network query by lat/lon box would.
#[derive(Debug, Clone, Default)]
pub struct StaticStations {
    readings: Vec<StationReading>,
}

impl StaticStations {
    /// Wrap a list of readings.
    pub fn new(readings: Vec<StationReading>) -> Self {
        Self { readings }
    }

    /// Parse a JSON array of readings:
    /// `[{"coordinate": {"lat": 37.56, "lon": 126.97}, "pm25": 30.0, "name": "Jung-gu"}]`.
    pub fn from_json(json: &str) -> EstimationResult<Self> {
        let readings: Vec<StationReading> = serde_json::from_str(json)
            .map_err(|e| EstimationError::invalid(format!("station list: {}", e)))?;
        Ok(Self::new(readings))
    }

    /// The readings held.
    pub fn readings(&self) -> &[StationReading] {
        &self.readings
    }

    /// Number of readings held.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True when no readings are held.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl StationSource for StaticStations {
    fn nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<StationReading>, SourceError>> {
        Box::pin(async move {
            let bounds = point.bounding_box(radius_km);
            Ok(self
                .readings
                .iter()
                .filter(|r| bounds.contains(&r.coordinate))
                .cloned()
                .collect())
        })
    }
}

/// A single fixed aerosol observation, returned for every point.
#[derive(Debug, Clone, Default)]
pub struct StaticAerosol {
    observation: Option<AerosolObservation>,
}

impl StaticAerosol {
    /// A source that always returns `observation`.
    pub fn new(observation: AerosolObservation) -> Self {
        Self {
            observation: Some(observation),
        }
    }

    /// A source with no retrieval available.
    pub fn empty() -> Self {
        Self { observation: None }
    }
}

impl AtmosphereSource for StaticAerosol {
    fn aerosol(&self, _point: GeoPoint) -> BoxFuture<'_, Result<AerosolObservation, SourceError>> {
        Box::pin(async move { self.observation.ok_or(SourceError::NoData) })
    }
}
