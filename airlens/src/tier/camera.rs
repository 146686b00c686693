//! Camera tier: PM2.5 from sky image features.
//!
//! The tier is defined by one signature, `ImageFeatures -> TierResult`,
//! captured by the [`CameraModel`] trait. Two implementations ship:
//!
//! - [`HeuristicCameraModel`]: closed-form weighted formula (default)
//! - [`LinearCameraModel`]: coefficients exported from a trained linear
//!   regressor
//!
//! Callers hold an `Arc<dyn CameraModel>` and never know which one runs.

use tracing::debug;

use super::{TierResult, TierSource};
use crate::error::{EstimationError, EstimationResult};
use crate::features::ImageFeatures;

/// Maps image features to a camera-tier estimate.
///
/// Implementations must be pure: the same features always give the same
/// result, and no state is kept between calls.
pub trait CameraModel: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Estimate PM2.5 from `features`.
    fn estimate(&self, features: &ImageFeatures) -> EstimationResult<TierResult>;
}

/// Weights and bounds for [`HeuristicCameraModel`].
///
/// Clear-sky features (brightness, saturation, blue ratio, contrast,
/// colorfulness) contribute `weight · (1 − feature)`; haze contributes
/// `weight · haze_score`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraWeights {
    /// Weight on (1 − brightness).
    pub brightness: f64,
    /// Weight on (1 − saturation).
    pub saturation: f64,
    /// Weight on (1 − blue ratio).
    pub blue_ratio: f64,
    /// Weight on (1 − contrast).
    pub contrast: f64,
    /// Weight on haze score.
    pub haze: f64,
    /// Weight on (1 − colorfulness).
    pub colorfulness: f64,
    /// Constant term (µg/m³).
    pub base: f64,
    /// Upper clip for the estimate (µg/m³).
    pub max_pm25: f64,
    /// Starting confidence before decisiveness adjustments.
    pub base_confidence: f64,
    /// Lower bound on the final confidence.
    pub min_confidence: f64,
    /// Upper bound on the final confidence.
    pub max_confidence: f64,
}

impl Default for CameraWeights {
    fn default() -> Self {
        Self {
            brightness: 50.0,
            saturation: 30.0,
            blue_ratio: 40.0,
            contrast: 25.0,
            haze: 45.0,
            colorfulness: 20.0,
            base: 10.0,
            max_pm25: 300.0,
            base_confidence: 0.5,
            min_confidence: 0.6,
            max_confidence: 0.95,
        }
    }
}

impl CameraWeights {
    /// Checks that every weight is finite and the bounds are ordered.
    pub fn validate(&self) -> EstimationResult<()> {
        let weights = [
            self.brightness,
            self.saturation,
            self.blue_ratio,
            self.contrast,
            self.haze,
            self.colorfulness,
            self.base,
            self.base_confidence,
        ];
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(EstimationError::Config(
                "camera weights must be finite".to_string(),
            ));
        }
        if !(self.max_pm25 > 0.0) {
            return Err(EstimationError::Config(format!(
                "camera max_pm25 must be positive, got {}",
                self.max_pm25
            )));
        }
        let ordered = 0.0 <= self.min_confidence
            && self.min_confidence <= self.max_confidence
            && self.max_confidence <= 1.0;
        if !ordered {
            return Err(EstimationError::Config(format!(
                "camera confidence bounds must satisfy 0 <= min <= max <= 1, got [{}, {}]",
                self.min_confidence, self.max_confidence
            )));
        }
        Ok(())
    }
}

/// Closed-form camera model.
///
/// Bright, saturated, blue, contrasty, colourful skies push the estimate
/// down; haze pushes it up.
#[derive(Debug, Clone, Default)]
pub struct HeuristicCameraModel {
    weights: CameraWeights,
}

impl HeuristicCameraModel {
    /// Creates a model with the given weights.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `weights` fails [`CameraWeights::validate`].
    pub fn new(weights: CameraWeights) -> EstimationResult<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// The weighted formula, clipped to `[0, max_pm25]`.
    pub fn pm25(&self, f: &ImageFeatures) -> f64 {
        let w = &self.weights;
        let raw = w.brightness * (1.0 - f.brightness)
            + w.saturation * (1.0 - f.saturation)
            + w.blue_ratio * (1.0 - f.blue_ratio)
            + w.contrast * (1.0 - f.contrast)
            + w.haze * f.haze_score
            + w.colorfulness * (1.0 - f.colorfulness)
            + w.base;
        raw.clamp(0.0, w.max_pm25)
    }

    /// Confidence grows when the features are decisive.
    pub fn confidence(&self, f: &ImageFeatures) -> f64 {
        let mut confidence = self.weights.base_confidence;

        // Clearly blue or clearly hazy
        if f.blue_ratio > 0.6 || f.haze_score > 0.6 {
            confidence += 0.2;
        }
        if f.contrast > 0.5 {
            confidence += 0.1;
        }
        // Neither under- nor over-exposed
        if f.brightness > 0.3 && f.brightness < 0.9 {
            confidence += 0.1;
        }
        if f.saturation > 0.5 || f.saturation < 0.3 {
            confidence += 0.1;
        }

        confidence.clamp(self.weights.min_confidence, self.weights.max_confidence)
    }
}

impl CameraModel for HeuristicCameraModel {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn estimate(&self, features: &ImageFeatures) -> EstimationResult<TierResult> {
        let value = self.pm25(features);
        let confidence = self.confidence(features);
        debug!(model = self.name(), value, confidence, "Camera tier estimate");
        TierResult::new(TierSource::Camera, value, confidence)
    }
}

/// Linear regressor over the feature vector.
///
/// `pm25 = intercept + Σ coefficients[i] · features[i]` in the order of
/// [`ImageFeatures::as_array`], clipped to `[0, max_pm25]`, reported with a
/// fixed confidence (typically the model's validation score).
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCameraModel {
    coefficients: [f64; 6],
    intercept: f64,
    confidence: f64,
    max_pm25: f64,
}

impl LinearCameraModel {
    /// Creates a linear model.
    ///
    /// # Errors
    ///
    /// Returns `Config` if any coefficient is non-finite or the confidence
    /// lies outside `[0, 1]`.
    pub fn new(
        coefficients: [f64; 6],
        intercept: f64,
        confidence: f64,
        max_pm25: f64,
    ) -> EstimationResult<Self> {
        if coefficients.iter().any(|c| !c.is_finite()) || !intercept.is_finite() {
            return Err(EstimationError::Config(
                "linear camera model coefficients must be finite".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EstimationError::Config(format!(
                "linear camera model confidence must be in [0, 1], got {}",
                confidence
            )));
        }
        if !(max_pm25 > 0.0) {
            return Err(EstimationError::Config(format!(
                "linear camera model max_pm25 must be positive, got {}",
                max_pm25
            )));
        }
        Ok(Self {
            coefficients,
            intercept,
            confidence,
            max_pm25,
        })
    }
}

impl CameraModel for LinearCameraModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn estimate(&self, features: &ImageFeatures) -> EstimationResult<TierResult> {
        let raw = features
            .as_array()
            .iter()
            .zip(self.coefficients.iter())
            .fold(self.intercept, |acc, (x, c)| acc + x * c);
        let value = raw.clamp(0.0, self.max_pm25);
        debug!(model = self.name(), value, "Camera tier estimate");
        TierResult::new(TierSource::Camera, value, self.confidence)
    }
}
