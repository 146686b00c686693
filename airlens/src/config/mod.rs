//! Engine configuration.
//!
//! [`EngineConfig`] bundles every tunable of the estimation pipeline. Its
//! `Default` reproduces the published constants exactly, so most callers
//! never touch it. [`ConfigFile`] loads the same values from an INI file:
//!
//! ```ini
//! [camera]
//! haze_weight = 45
//! target_samples = 1000
//!
//! [station]
//! search_radius_km = 50
//! max_stations = 10
//!
//! [satellite]
//! slope = 120
//! intercept = 5
//!
//! [fusion]
//! tight_threshold = 5
//! tight_bonus = 0.15
//!
//! [timeouts]
//! station_ms = 5000
//! camera_ms = 10000
//! satellite_ms = 5000
//!
//! [cache]
//! enabled = true
//! ttl_secs = 300
//!
//! [logging]
//! filter = airlens=info
//! ```

mod file;

pub use file::{
    config_directory, config_file_path, CacheSettings, ConfigError, ConfigFile, LoggingSettings,
    CONFIG_FILE_NAME, DEFAULT_LOG_FILTER,
};

use crate::error::{EstimationError, EstimationResult};
use crate::features::FeatureExtractorConfig;
use crate::fusion::FusionConfig;
use crate::orchestrator::TierTimeouts;
use crate::tier::{CameraWeights, SatelliteConfig, StationConfig};

/// Every tunable of the estimation pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Image sampling.
    pub extractor: FeatureExtractorConfig,
    /// Heuristic camera model weights.
    pub camera: CameraWeights,
    /// Station interpolation.
    pub station: StationConfig,
    /// AOD conversion.
    pub satellite: SatelliteConfig,
    /// Agreement bonus schedule.
    pub fusion: FusionConfig,
    /// Per-tier deadlines.
    pub timeouts: TierTimeouts,
}

impl EngineConfig {
    /// Replace the station tier settings.
    pub fn with_station(mut self, station: StationConfig) -> Self {
        self.station = station;
        self
    }

    /// Replace the camera model weights.
    pub fn with_camera(mut self, camera: CameraWeights) -> Self {
        self.camera = camera;
        self
    }

    /// Replace the satellite coefficients.
    pub fn with_satellite(mut self, satellite: SatelliteConfig) -> Self {
        self.satellite = satellite;
        self
    }

    /// Replace the fusion thresholds and bonuses.
    pub fn with_fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = fusion;
        self
    }

    /// Replace the per-tier deadlines.
    pub fn with_timeouts(mut self, timeouts: TierTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Validates every section; the first failure wins.
    pub fn validate(&self) -> EstimationResult<()> {
        if self.extractor.target_samples == 0 {
            return Err(EstimationError::Config(
                "feature extractor target_samples must be at least 1".to_string(),
            ));
        }
        self.camera.validate()?;
        self.station.validate()?;
        self.satellite.validate()?;
        self.fusion.validate()?;
        self.timeouts.validate()
    }
}
