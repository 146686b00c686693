//! INI configuration file.
//!
//! The file lives at `<config dir>/airlens/config.ini` (for example
//! `~/.config/airlens/config.ini` on Linux). A missing file is not an error;
//! every key is optional and falls back to its default. Unknown sections and
//! keys are ignored.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::EngineConfig;
use crate::error::EstimationError;

/// File name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "airlens=info";

/// Errors from loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read or written.
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI or a value is malformed.
    #[error("config parse error: {0}")]
    Parse(String),

    /// Every value parsed but the combination is unusable.
    #[error(transparent)]
    Invalid(#[from] EstimationError),
}

/// `<platform config dir>/airlens`, or `./airlens` if the platform has none.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("airlens")
}

/// Default config file location.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Station cache decorator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Wrap the station source in a cache.
    pub enabled: bool,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Maximum number of cached locations.
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            max_entries: 1000,
        }
    }
}

impl CacheSettings {
    /// Entry lifetime as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Directory for daily log files; stderr only when `None`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Estimation tunables.
    pub engine: EngineConfig,
    /// `[cache]` section.
    pub cache: CacheSettings,
    /// `[logging]` section.
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`; defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini_str(&contents)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parse INI text.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        let camera = Section::new(&ini, "camera");
        let weights = &mut config.engine.camera;
        camera.read("brightness_weight", &mut weights.brightness)?;
        camera.read("saturation_weight", &mut weights.saturation)?;
        camera.read("blue_ratio_weight", &mut weights.blue_ratio)?;
        camera.read("contrast_weight", &mut weights.contrast)?;
        camera.read("haze_weight", &mut weights.haze)?;
        camera.read("colorfulness_weight", &mut weights.colorfulness)?;
        camera.read("base", &mut weights.base)?;
        camera.read("max_pm25", &mut weights.max_pm25)?;
        camera.read("base_confidence", &mut weights.base_confidence)?;
        camera.read("min_confidence", &mut weights.min_confidence)?;
        camera.read("max_confidence", &mut weights.max_confidence)?;
        camera.read("target_samples", &mut config.engine.extractor.target_samples)?;

        let station = Section::new(&ini, "station");
        let s = &mut config.engine.station;
        station.read("search_radius_km", &mut s.search_radius_km)?;
        station.read("epsilon_km", &mut s.epsilon_km)?;
        station.read("max_stations", &mut s.max_stations)?;
        station.read("max_confidence", &mut s.max_confidence)?;
        station.read("confidence_scale_km", &mut s.confidence_scale_km)?;

        let satellite = Section::new(&ini, "satellite");
        let sat = &mut config.engine.satellite;
        satellite.read("slope", &mut sat.slope)?;
        satellite.read("intercept", &mut sat.intercept)?;
        satellite.read("humidity_reference", &mut sat.humidity_reference)?;
        satellite.read("humidity_scale", &mut sat.humidity_scale)?;
        satellite.read("confidence_with_humidity", &mut sat.confidence_with_humidity)?;
        satellite.read("confidence_without_humidity", &mut sat.confidence_without_humidity)?;

        let fusion = Section::new(&ini, "fusion");
        let f = &mut config.engine.fusion;
        fusion.read("tight_threshold", &mut f.tight_threshold)?;
        fusion.read("tight_bonus", &mut f.tight_bonus)?;
        fusion.read("loose_threshold", &mut f.loose_threshold)?;
        fusion.read("loose_bonus", &mut f.loose_bonus)?;
        fusion.read("max_confidence", &mut f.max_confidence)?;

        let timeouts = Section::new(&ini, "timeouts");
        let t = &mut config.engine.timeouts;
        timeouts.read_millis("station_ms", &mut t.station)?;
        timeouts.read_millis("camera_ms", &mut t.camera)?;
        timeouts.read_millis("satellite_ms", &mut t.satellite)?;

        let cache = Section::new(&ini, "cache");
        cache.read_bool("enabled", &mut config.cache.enabled)?;
        cache.read("ttl_secs", &mut config.cache.ttl_secs)?;
        cache.read("max_entries", &mut config.cache.max_entries)?;

        let logging = Section::new(&ini, "logging");
        if let Some(filter) = logging.raw("filter") {
            config.logging.filter = filter.to_string();
        }
        if let Some(dir) = logging.raw("directory") {
            config.logging.directory = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Validated engine configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.engine.validate()?;
        Ok(self.engine.clone())
    }

    /// Render every value, defaults included, as INI.
    pub fn to_ini(&self) -> Ini {
        let e = &self.engine;
        let mut ini = Ini::new();

        ini.with_section(Some("camera"))
            .set("brightness_weight", e.camera.brightness.to_string())
            .set("saturation_weight", e.camera.saturation.to_string())
            .set("blue_ratio_weight", e.camera.blue_ratio.to_string())
            .set("contrast_weight", e.camera.contrast.to_string())
            .set("haze_weight", e.camera.haze.to_string())
            .set("colorfulness_weight", e.camera.colorfulness.to_string())
            .set("base", e.camera.base.to_string())
            .set("max_pm25", e.camera.max_pm25.to_string())
            .set("base_confidence", e.camera.base_confidence.to_string())
            .set("min_confidence", e.camera.min_confidence.to_string())
            .set("max_confidence", e.camera.max_confidence.to_string())
            .set("target_samples", e.extractor.target_samples.to_string());

        ini.with_section(Some("station"))
            .set("search_radius_km", e.station.search_radius_km.to_string())
            .set("epsilon_km", e.station.epsilon_km.to_string())
            .set("max_stations", e.station.max_stations.to_string())
            .set("max_confidence", e.station.max_confidence.to_string())
            .set("confidence_scale_km", e.station.confidence_scale_km.to_string());

        ini.with_section(Some("satellite"))
            .set("slope", e.satellite.slope.to_string())
            .set("intercept", e.satellite.intercept.to_string())
            .set("humidity_reference", e.satellite.humidity_reference.to_string())
            .set("humidity_scale", e.satellite.humidity_scale.to_string())
            .set(
                "confidence_with_humidity",
                e.satellite.confidence_with_humidity.to_string(),
            )
            .set(
                "confidence_without_humidity",
                e.satellite.confidence_without_humidity.to_string(),
            );

        ini.with_section(Some("fusion"))
            .set("tight_threshold", e.fusion.tight_threshold.to_string())
            .set("tight_bonus", e.fusion.tight_bonus.to_string())
            .set("loose_threshold", e.fusion.loose_threshold.to_string())
            .set("loose_bonus", e.fusion.loose_bonus.to_string())
            .set("max_confidence", e.fusion.max_confidence.to_string());

        ini.with_section(Some("timeouts"))
            .set("station_ms", e.timeouts.station.as_millis().to_string())
            .set("camera_ms", e.timeouts.camera.as_millis().to_string())
            .set("satellite_ms", e.timeouts.satellite.as_millis().to_string());

        ini.with_section(Some("cache"))
            .set("enabled", self.cache.enabled.to_string())
            .set("ttl_secs", self.cache.ttl_secs.to_string())
            .set("max_entries", self.cache.max_entries.to_string());

        ini.with_section(Some("logging"))
            .set("filter", self.logging.filter.clone())
            .set(
                "directory",
                self.logging
                    .directory
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
            );

        ini
    }

    /// Save to the default location, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        self.to_ini().write_to_file(path).map_err(io_err)
    }
}

/// Typed reads from one INI section.
struct Section<'a> {
    ini: &'a Ini,
    name: &'static str,
}

impl<'a> Section<'a> {
    fn new(ini: &'a Ini, name: &'static str) -> Self {
        Self { ini, name }
    }

    fn raw(&self, key: &str) -> Option<&'a str> {
        self.ini.get_from(Some(self.name), key).map(str::trim)
    }

    /// Overwrites `target` only when the key is present.
    fn read<T>(&self, key: &str, target: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        if let Some(raw) = self.raw(key) {
            *target = raw.parse().map_err(|e| self.malformed(key, raw, e))?;
        }
        Ok(())
    }

    fn read_millis(&self, key: &str, target: &mut Duration) -> Result<(), ConfigError> {
        let mut millis = target.as_millis() as u64;
        self.read(key, &mut millis)?;
        *target = Duration::from_millis(millis);
        Ok(())
    }

    fn read_bool(&self, key: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(raw) = self.raw(key) {
            *target = match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => return Err(self.malformed(key, raw, "expected true or false")),
            };
        }
        Ok(())
    }

    fn malformed(&self, key: &str, raw: &str, reason: impl Display) -> ConfigError {
        ConfigError::Parse(format!(
            "[{}] {} = '{}': {}",
            self.name, key, raw, reason
        ))
    }
}
