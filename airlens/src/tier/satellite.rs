//! Satellite tier: aerosol optical depth to PM2.5.
//!
//! Uses an empirical linear fit with an optional hygroscopic correction:
//!
//! ```text
//! pm25 = 120·AOD + 5
//! pm25 *= 1 + (RH − 50) / 100      (only when humidity is known)
//! ```
//!
//! Confidence is fixed: 0.75 with humidity, 0.70 without.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TierResult, TierSource};
use crate::error::{EstimationError, EstimationResult};

/// One AOD retrieval, optionally paired with surface relative humidity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AerosolObservation {
    /// Aerosol optical depth (dimensionless, ≥ 0).
    pub aod: f64,
    /// Relative humidity in percent, if known.
    #[serde(default)]
    pub humidity: Option<f64>,
}

impl AerosolObservation {
    /// Observation without humidity.
    pub fn new(aod: f64) -> Self {
        Self {
            aod,
            humidity: None,
        }
    }

    /// Attach relative humidity (%).
    pub fn with_humidity(mut self, humidity: f64) -> Self {
        self.humidity = Some(humidity);
        self
    }
}

/// Conversion coefficients for the satellite tier.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteConfig {
    /// µg/m³ per unit AOD.
    pub slope: f64,
    /// µg/m³ at zero AOD.
    pub intercept: f64,
    /// Humidity (%) at which no correction applies.
    pub humidity_reference: f64,
    /// Humidity points per unit of correction factor.
    pub humidity_scale: f64,
    /// Confidence when humidity is supplied.
    pub confidence_with_humidity: f64,
    /// Confidence when humidity is missing.
    pub confidence_without_humidity: f64,
}

impl Default for SatelliteConfig {
    fn default() -> Self {
        Self {
            slope: 120.0,
            intercept: 5.0,
            humidity_reference: 50.0,
            humidity_scale: 100.0,
            confidence_with_humidity: 0.75,
            confidence_without_humidity: 0.70,
        }
    }
}

impl SatelliteConfig {
    /// Checks that every parameter is usable.
    pub fn validate(&self) -> EstimationResult<()> {
        if !self.slope.is_finite() || !self.intercept.is_finite() {
            return Err(EstimationError::Config(
                "satellite slope and intercept must be finite".to_string(),
            ));
        }
        if !self.humidity_reference.is_finite() {
            return Err(EstimationError::Config(format!(
                "satellite humidity reference must be finite, got {}",
                self.humidity_reference
            )));
        }
        if !(self.humidity_scale > 0.0) {
            return Err(EstimationError::Config(format!(
                "satellite humidity scale must be positive, got {}",
                self.humidity_scale
            )));
        }
        for c in [
            self.confidence_with_humidity,
            self.confidence_without_humidity,
        ] {
            if !(0.0..=1.0).contains(&c) {
                return Err(EstimationError::Config(format!(
                    "satellite confidence must be in [0, 1], got {}",
                    c
                )));
            }
        }
        Ok(())
    }
}

/// Converts AOD retrievals to PM2.5.
#[derive(Debug, Clone, Default)]
pub struct SatelliteEstimator {
    config: SatelliteConfig,
}

impl SatelliteEstimator {
    /// Creates an estimator with the given coefficients.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `config` fails [`SatelliteConfig::validate`].
    pub fn new(config: SatelliteConfig) -> EstimationResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Estimate from a bundled observation.
    pub fn estimate_observation(&self, obs: &AerosolObservation) -> EstimationResult<TierResult> {
        self.estimate(obs.aod, obs.humidity)
    }

    /// Estimate PM2.5 from AOD and optional relative humidity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a negative or non-finite AOD, or a humidity
    /// outside `[0, 100]`.
    pub fn estimate(&self, aod: f64, humidity: Option<f64>) -> EstimationResult<TierResult> {
        if !aod.is_finite() || aod < 0.0 {
            return Err(EstimationError::invalid(format!(
                "AOD must be a finite non-negative number, got {}",
                aod
            )));
        }

        let cfg = &self.config;
        let mut pm25 = cfg.slope * aod + cfg.intercept;

        let confidence = match humidity {
            Some(rh) => {
                if !(0.0..=100.0).contains(&rh) {
                    return Err(EstimationError::invalid(format!(
                        "relative humidity must be in [0, 100] %, got {}",
                        rh
                    )));
                }
                pm25 *= 1.0 + (rh - cfg.humidity_reference) / cfg.humidity_scale;
                cfg.confidence_with_humidity
            }
            None => cfg.confidence_without_humidity,
        };

        // max() would turn NaN into 0
        if !pm25.is_finite() {
            return Err(EstimationError::invalid(format!(
                "AOD {} does not convert to a finite PM2.5",
                aod
            )));
        }
        let pm25 = pm25.max(0.0);
        debug!(aod, ?humidity, pm25, confidence, "Satellite AOD conversion");

        TierResult::new(TierSource::Satellite, pm25, confidence)
    }
}
