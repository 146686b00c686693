//! Sky image features.
//!
//! Reduces a decoded RGB bitmap to six scalar features in `[0, 1]` that the
//! camera tier regresses PM2.5 from. Extraction subsamples the image so cost
//! is bounded regardless of resolution.
//!
//! # Example
//!
//! ```
//! use airlens::features::{FeatureExtractor, FeatureExtractorConfig};
//! use image::{Rgb, RgbImage};
//!
//! let sky = RgbImage::from_pixel(64, 48, Rgb([90, 150, 230]));
//! let features = FeatureExtractor::new(FeatureExtractorConfig::default())
//!     .extract(&sky)
//!     .unwrap();
//! assert_eq!(features.blue_ratio, 1.0);
//! ```

mod extractor;

pub use extractor::{FeatureExtractor, FeatureExtractorConfig, DEFAULT_TARGET_SAMPLES};

use serde::Serialize;

/// Scalar features of a sky photograph.
///
/// Every field lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageFeatures {
    /// Mean of (r+g+b)/3.
    pub brightness: f64,
    /// Mean HSV-style saturation, (max−min)/max.
    pub saturation: f64,
    /// Fraction of blue-sky pixels (b > r and b > 0.8·g).
    pub blue_ratio: f64,
    /// min(1, 4·stddev of per-pixel brightness).
    pub contrast: f64,
    /// Fraction of bright, near-achromatic pixels.
    pub haze_score: f64,
    /// min(1, 2·mean opponent-colour magnitude).
    pub colorfulness: f64,
    /// Number of pixels the features were computed from.
    pub sample_count: usize,
}

impl ImageFeatures {
    /// Features in fixed order: brightness, saturation, blue ratio,
    /// contrast, haze, colorfulness.
    ///
    /// Learned models consume this layout.
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.brightness,
            self.saturation,
            self.blue_ratio,
            self.contrast,
            self.haze_score,
            self.colorfulness,
        ]
    }
}
