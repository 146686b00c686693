//! Feature extraction from RGB bitmaps.

use image::{DynamicImage, RgbImage};
use tracing::debug;

use super::ImageFeatures;
use crate::error::{EstimationError, EstimationResult};

/// Default number of pixels to sample per image.
pub const DEFAULT_TARGET_SAMPLES: usize = 1000;

/// Blue must exceed green scaled by this factor to count as sky blue.
const BLUE_GREEN_FACTOR: f64 = 0.8;

/// Maximum channel deviation from the pixel mean for an achromatic pixel.
const HAZE_MAX_DEVIATION: f64 = 0.1;

/// Minimum pixel mean for a hazy pixel.
const HAZE_MIN_BRIGHTNESS: f64 = 0.5;

/// Configuration for [`FeatureExtractor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureExtractorConfig {
    /// Approximate number of pixels to sample.
    ///
    /// The stride is `max(1, pixel_count / target_samples)`, so small images
    /// are read in full and large ones yield between one and two times this
    /// many samples.
    pub target_samples: usize,
}

impl Default for FeatureExtractorConfig {
    fn default() -> Self {
        Self {
            target_samples: DEFAULT_TARGET_SAMPLES,
        }
    }
}

impl FeatureExtractorConfig {
    /// Set the target sample count.
    pub fn with_target_samples(mut self, target_samples: usize) -> Self {
        self.target_samples = target_samples;
        self
    }
}

/// Computes [`ImageFeatures`] from a bitmap.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureExtractorConfig,
}

impl FeatureExtractor {
    /// Creates an extractor.
    pub fn new(config: FeatureExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract features from any decoded image, converting to RGB8 first.
    pub fn extract_dynamic(&self, image: &DynamicImage) -> EstimationResult<ImageFeatures> {
        self.extract(&image.to_rgb8())
    }

    /// Extract features from an RGB8 bitmap.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the image has zero pixels.
    pub fn extract(&self, image: &RgbImage) -> EstimationResult<ImageFeatures> {
        let (width, height) = image.dimensions();
        let pixel_count = width as usize * height as usize;
        if pixel_count == 0 {
            return Err(EstimationError::invalid(format!(
                "image has zero pixels ({}x{})",
                width, height
            )));
        }

        let stride = (pixel_count / self.config.target_samples.max(1)).max(1);
        let samples: Vec<[f64; 3]> = image
            .pixels()
            .step_by(stride)
            .map(|p| {
                [
                    p[0] as f64 / 255.0,
                    p[1] as f64 / 255.0,
                    p[2] as f64 / 255.0,
                ]
            })
            .collect();

        let features = compute_features(&samples);
        debug!(
            width,
            height,
            stride,
            samples = features.sample_count,
            brightness = features.brightness,
            haze = features.haze_score,
            blue = features.blue_ratio,
            "Extracted image features"
        );
        Ok(features)
    }
}

/// Computes all six features over normalised samples.
///
/// `samples` must be non-empty.
fn compute_features(samples: &[[f64; 3]]) -> ImageFeatures {
    let n = samples.len() as f64;

    let mut brightness_sum = 0.0;
    let mut saturation_sum = 0.0;
    let mut blue_count = 0usize;
    let mut haze_count = 0usize;
    let mut colorfulness_sum = 0.0;
    let mut brightness_values = Vec::with_capacity(samples.len());

    for &[r, g, b] in samples {
        let mean = (r + g + b) / 3.0;
        brightness_values.push(mean);
        brightness_sum += mean;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        if max > 0.0 {
            saturation_sum += (max - min) / max;
        }

        if b > r && b > BLUE_GREEN_FACTOR * g {
            blue_count += 1;
        }

        let max_deviation = (r - mean)
            .abs()
            .max((g - mean).abs())
            .max((b - mean).abs());
        if max_deviation < HAZE_MAX_DEVIATION && mean > HAZE_MIN_BRIGHTNESS {
            haze_count += 1;
        }

        let rg = r - g;
        let yb = 0.5 * (r + g) - b;
        colorfulness_sum += (rg * rg + yb * yb).sqrt();
    }

    let brightness = brightness_sum / n;
    let variance = brightness_values
        .iter()
        .map(|v| (v - brightness).powi(2))
        .sum::<f64>()
        / n;

    ImageFeatures {
        brightness,
        saturation: saturation_sum / n,
        blue_ratio: blue_count as f64 / n,
        contrast: (4.0 * variance.sqrt()).min(1.0),
        haze_score: haze_count as f64 / n,
        colorfulness: (2.0 * colorfulness_sum / n).min(1.0),
        sample_count: samples.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::default()
    }

    #[test]
    fn test_zero_size_image_is_invalid() {
        let empty = RgbImage::new(0, 10);
        let err = extractor().extract(&empty).unwrap_err();
        assert!(matches!(err, EstimationError::InvalidInput(_)));
    }

    #[test]
    fn test_pure_blue_sky() {
        let sky = RgbImage::from_pixel(40, 30, Rgb([60, 120, 230]));
        let f = extractor().extract(&sky).unwrap();

        assert_eq!(f.blue_ratio, 1.0);
        assert_eq!(f.haze_score, 0.0);
        assert!(f.contrast < 1e-9, "Uniform image has no contrast");
        assert!(f.saturation > 0.7);
    }

    #[test]
    fn test_uniform_light_grey_is_hazy() {
        let haze = RgbImage::from_pixel(50, 50, Rgb([200, 200, 200]));
        let f = extractor().extract(&haze).unwrap();

        assert_eq!(f.haze_score, 1.0);
        assert_eq!(f.saturation, 0.0);
        assert!(f.contrast < 1e-9);
        assert_eq!(f.colorfulness, 0.0);
        assert_eq!(f.blue_ratio, 0.0);
        assert!((f.brightness - 200.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn test_dark_grey_is_not_hazy() {
        let dusk = RgbImage::from_pixel(10, 10, Rgb([60, 60, 60]));
        let f = extractor().extract(&dusk).unwrap();
        assert_eq!(f.haze_score, 0.0);
    }

    #[test]
    fn test_black_image_has_zero_saturation() {
        let black = RgbImage::new(8, 8);
        let f = extractor().extract(&black).unwrap();
        assert_eq!(f.saturation, 0.0);
        assert_eq!(f.brightness, 0.0);
    }

    #[test]
    fn test_half_black_half_white_contrast_saturates() {
        // stddev of {0, 1} halves is 0.5, so 4·0.5 clips to 1
        let mut img = RgbImage::new(10, 10);
        for (x, _, p) in img.enumerate_pixels_mut() {
            if x < 5 {
                *p = Rgb([255, 255, 255]);
            }
        }
        let f = extractor().extract(&img).unwrap();
        assert_eq!(f.contrast, 1.0);
        assert!((f.brightness - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_large_image_is_subsampled() {
        let big = RgbImage::from_pixel(400, 300, Rgb([120, 130, 140]));
        let f = extractor().extract(&big).unwrap();

        // 120_000 / 1000 = stride 120 → exactly 1000 samples
        assert_eq!(f.sample_count, 1000);
    }

    #[test]
    fn test_small_image_reads_every_pixel() {
        let small = RgbImage::from_pixel(20, 10, Rgb([10, 20, 30]));
        let f = extractor().extract(&small).unwrap();
        assert_eq!(f.sample_count, 200);
    }

    #[test]
    fn test_custom_target_samples() {
        let img = RgbImage::from_pixel(100, 100, Rgb([10, 20, 30]));
        let f = FeatureExtractor::new(FeatureExtractorConfig::default().with_target_samples(100))
            .extract(&img)
            .unwrap();
        assert_eq!(f.sample_count, 100);
    }

    #[test]
    fn test_features_are_deterministic() {
        let mut img = RgbImage::new(64, 64);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([(x * 4) as u8, (y * 4) as u8, 128]);
        }
        let a = extractor().extract(&img).unwrap();
        let b = extractor().extract(&img).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_all_features_in_unit_range() {
        let mut img = RgbImage::new(64, 64);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgb([(x * 4) as u8, 255 - (y * 4) as u8, ((x + y) * 2) as u8]);
        }
        let f = extractor().extract(&img).unwrap();
        for value in f.as_array() {
            assert!((0.0..=1.0).contains(&value), "Feature out of range: {}", value);
        }
    }

    #[test]
    fn test_dynamic_image_is_converted() {
        let rgba = image::RgbaImage::from_pixel(16, 16, image::Rgba([200, 200, 200, 255]));
        let f = extractor()
            .extract_dynamic(&DynamicImage::ImageRgba8(rgba))
            .unwrap();
        assert_eq!(f.haze_score, 1.0);
    }
}
