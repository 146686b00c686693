//! US EPA PM2.5 categories and sky descriptions.

use std::fmt;

use serde::Serialize;

use crate::features::ImageFeatures;

/// PM2.5 category on the US EPA scale (µg/m³, inclusive upper bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiLevel {
    /// ≤ 12
    Good,
    /// ≤ 35
    Moderate,
    /// ≤ 55
    UnhealthyForSensitiveGroups,
    /// ≤ 150
    Unhealthy,
    /// ≤ 250
    VeryUnhealthy,
    /// > 250
    Hazardous,
}

impl AqiLevel {
    /// Category for a concentration.
    pub fn from_pm25(pm25: f64) -> Self {
        match pm25 {
            v if v <= 12.0 => AqiLevel::Good,
            v if v <= 35.0 => AqiLevel::Moderate,
            v if v <= 55.0 => AqiLevel::UnhealthyForSensitiveGroups,
            v if v <= 150.0 => AqiLevel::Unhealthy,
            v if v <= 250.0 => AqiLevel::VeryUnhealthy,
            _ => AqiLevel::Hazardous,
        }
    }

    /// Human-readable category name.
    pub fn name(&self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiLevel::Unhealthy => "Unhealthy",
            AqiLevel::VeryUnhealthy => "Very Unhealthy",
            AqiLevel::Hazardous => "Hazardous",
        }
    }

    /// Short health guidance.
    pub fn advice(&self) -> &'static str {
        match self {
            AqiLevel::Good => "Air quality is satisfactory.",
            AqiLevel::Moderate => "Unusually sensitive people should limit prolonged exertion.",
            AqiLevel::UnhealthyForSensitiveGroups => {
                "Sensitive groups should reduce prolonged outdoor exertion."
            }
            AqiLevel::Unhealthy => "Everyone should reduce prolonged outdoor exertion.",
            AqiLevel::VeryUnhealthy => "Avoid prolonged outdoor exertion.",
            AqiLevel::Hazardous => "Remain indoors and keep activity levels low.",
        }
    }
}

impl fmt::Display for AqiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One-line description of what the sky suggests about air quality.
pub fn sky_description(features: &ImageFeatures, pm25: f64) -> &'static str {
    if pm25 < 15.0 {
        if features.blue_ratio > 0.6 {
            "Clear blue skies with excellent visibility"
        } else if features.brightness > 0.7 {
            "Bright conditions with clean air"
        } else {
            "Good air quality detected"
        }
    } else if pm25 < 35.0 {
        if features.haze_score > 0.3 {
            "Slight haze visible in the atmosphere"
        } else {
            "Moderate conditions with acceptable air quality"
        }
    } else if pm25 < 55.0 {
        "Noticeable haze reducing visibility"
    } else if pm25 < 100.0 {
        "Significant haze and reduced visibility"
    } else if pm25 < 150.0 {
        "Heavy haze with poor air quality"
    } else {
        "Severe haze and very poor visibility"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(blue_ratio: f64, brightness: f64, haze_score: f64) -> ImageFeatures {
        ImageFeatures {
            brightness,
            saturation: 0.5,
            blue_ratio,
            contrast: 0.5,
            haze_score,
            colorfulness: 0.5,
            sample_count: 100,
        }
    }

    #[test]
    fn test_category_boundaries_are_inclusive() {
        assert_eq!(AqiLevel::from_pm25(0.0), AqiLevel::Good);
        assert_eq!(AqiLevel::from_pm25(12.0), AqiLevel::Good);
        assert_eq!(AqiLevel::from_pm25(12.1), AqiLevel::Moderate);
        assert_eq!(AqiLevel::from_pm25(35.0), AqiLevel::Moderate);
        assert_eq!(AqiLevel::from_pm25(55.0), AqiLevel::UnhealthyForSensitiveGroups);
        assert_eq!(AqiLevel::from_pm25(150.0), AqiLevel::Unhealthy);
        assert_eq!(AqiLevel::from_pm25(250.0), AqiLevel::VeryUnhealthy);
        assert_eq!(AqiLevel::from_pm25(250.1), AqiLevel::Hazardous);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(AqiLevel::Good < AqiLevel::Hazardous);
        assert_eq!(
            AqiLevel::UnhealthyForSensitiveGroups.to_string(),
            "Unhealthy for Sensitive Groups"
        );
    }

    #[test]
    fn test_clean_air_descriptions() {
        assert_eq!(
            sky_description(&features(0.8, 0.5, 0.0), 8.0),
            "Clear blue skies with excellent visibility"
        );
        assert_eq!(
            sky_description(&features(0.1, 0.8, 0.0), 8.0),
            "Bright conditions with clean air"
        );
        assert_eq!(
            sky_description(&features(0.1, 0.4, 0.0), 8.0),
            "Good air quality detected"
        );
    }

    #[test]
    fn test_haze_descriptions() {
        assert_eq!(
            sky_description(&features(0.1, 0.6, 0.5), 25.0),
            "Slight haze visible in the atmosphere"
        );
        assert_eq!(
            sky_description(&features(0.1, 0.6, 0.1), 25.0),
            "Moderate conditions with acceptable air quality"
        );
        assert_eq!(
            sky_description(&features(0.0, 0.6, 0.9), 120.0),
            "Heavy haze with poor air quality"
        );
        assert_eq!(
            sky_description(&features(0.0, 0.6, 0.9), 200.0),
            "Severe haze and very poor visibility"
        );
    }
}
