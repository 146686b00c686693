//! Geographic coordinate module
//!
//! Provides a validated latitude/longitude point and the great-circle math
//! used by the station tier: haversine distance and a search bounding box.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.0;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors from coordinate validation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is NaN or outside [-90, 90].
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude is NaN or outside [-180, 180].
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),
}

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a validated point.
    ///
    /// # Errors
    ///
    /// Returns `CoordError` when either component is NaN or out of range.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordError> {
        let point = Self { lat, lon };
        point.validate()?;
        Ok(point)
    }

    /// Checks that both components are finite and in range.
    ///
    /// Fields are public, so a point built with a struct literal may be
    /// invalid; consumers call this before doing any math.
    pub fn validate(&self) -> Result<(), CoordError> {
        // `contains` is false for NaN, which covers the non-finite case
        if !(MIN_LAT..=MAX_LAT).contains(&self.lat) {
            return Err(CoordError::InvalidLatitude(self.lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&self.lon) {
            return Err(CoordError::InvalidLongitude(self.lon));
        }
        Ok(())
    }

    /// Great-circle distance to `other` in kilometres.
    #[inline]
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }

    /// Bounding box enclosing a circle of `radius_km` around this point.
    ///
    /// Uses the flat approximation of 111 km per degree, widened in longitude
    /// by `1 / cos(lat)`. Near the poles the longitude span becomes the full
    /// range. A box that crosses the antimeridian wraps, leaving
    /// `min_lon > max_lon`.
    pub fn bounding_box(&self, radius_km: f64) -> GeoBounds {
        let lat_delta = radius_km / KM_PER_DEGREE;
        let cos_lat = (self.lat * PI / 180.0).cos();
        let lon_delta = if cos_lat > 1e-6 {
            radius_km / (KM_PER_DEGREE * cos_lat)
        } else {
            MAX_LON
        };

        let (min_lon, max_lon) = if lon_delta >= MAX_LON {
            (MIN_LON, MAX_LON)
        } else {
            (
                wrap_longitude(self.lon - lon_delta),
                wrap_longitude(self.lon + lon_delta),
            )
        };

        GeoBounds {
            min_lat: (self.lat - lat_delta).max(MIN_LAT),
            max_lat: (self.lat + lat_delta).min(MAX_LAT),
            min_lon,
            max_lon,
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Shift a longitude by whole turns back into [-180, 180].
fn wrap_longitude(lon: f64) -> f64 {
    if lon < MIN_LON {
        lon + 360.0
    } else if lon > MAX_LON {
        lon - 360.0
    } else {
        lon
    }
}

/// Latitude/longitude rectangle, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    /// Southern edge in degrees.
    pub min_lat: f64,
    /// Northern edge in degrees.
    pub max_lat: f64,
    /// Western edge in degrees. Greater than `max_lon` when the box
    /// crosses the antimeridian.
    pub min_lon: f64,
    /// Eastern edge in degrees.
    pub max_lon: f64,
}

impl GeoBounds {
    /// Returns true if the longitude span wraps past ±180°.
    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lon > self.max_lon
    }

    /// Returns true if `point` lies inside the rectangle.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let lon_inside = if self.crosses_antimeridian() {
            point.lon >= self.min_lon || point.lon <= self.max_lon
        } else {
            (self.min_lon..=self.max_lon).contains(&point.lon)
        };
        (self.min_lat..=self.max_lat).contains(&point.lat) && lon_inside
    }
}

/// Haversine great-circle distance between two points, in kilometres.
///
/// All inputs in degrees.
#[inline]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let to_rad = PI / 180.0;
    let d_lat = (lat2 - lat1) * to_rad;
    let d_lon = (lon2 - lon1) * to_rad;

    let a = (d_lat / 2.0).sin().powi(2)
        + (lat1 * to_rad).cos() * (lat2 * to_rad).cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
