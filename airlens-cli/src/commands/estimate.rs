//! `airlens estimate`: one full estimation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use airlens::cache::CachedStationSource;
use airlens::config::ConfigFile;
use airlens::coord::GeoPoint;
use airlens::orchestrator::{EstimationOrchestrator, EstimationRequest, StaticStations};
use airlens::tier::AerosolObservation;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::load_image;
use crate::error::CliError;
use crate::output;

/// Estimate arguments. Every input is optional; tiers without input are
/// reported unavailable.
#[derive(Debug, Args)]
pub struct EstimateArgs {
    /// Sky photograph (PNG or JPEG)
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,

    /// Query latitude in degrees
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Query longitude in degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// JSON array of station readings
    #[arg(long, value_name = "FILE", requires = "lat")]
    pub stations: Option<PathBuf>,

    /// Satellite aerosol optical depth
    #[arg(long)]
    pub aod: Option<f64>,

    /// Relative humidity in percent, used with --aod
    #[arg(long, requires = "aod")]
    pub humidity: Option<f64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the estimate command.
pub fn run(args: EstimateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let engine = config.to_engine_config()?;
    let request = build_request(&args)?;

    let mut orchestrator = EstimationOrchestrator::new(engine)?;
    if let Some(path) = &args.stations {
        let stations = load_stations(path)?;
        info!(count = stations.len(), path = %path.display(), "Loaded station readings");
        let source = CachedStationSource::wrap_if_enabled(Arc::new(stations), &config.cache);
        orchestrator = orchestrator.with_station_source(source);
    }

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Cancelling estimation...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let report = runtime.block_on(orchestrator.estimate(request, &cancel));

    if args.json {
        output::print_report_json(&report)?;
    } else {
        output::print_report(&report);
    }

    match report.fused {
        Ok(_) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Assemble the request from arguments, decoding the image if given.
fn build_request(args: &EstimateArgs) -> Result<EstimationRequest, CliError> {
    let mut request = EstimationRequest::new();

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        let point = GeoPoint::new(lat, lon)
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
        request = request.with_location(point);
    }

    if let Some(path) = &args.image {
        request = request.with_image(load_image(path)?);
    }

    if let Some(aod) = args.aod {
        let observation = match args.humidity {
            Some(h) => AerosolObservation::new(aod).with_humidity(h),
            None => AerosolObservation::new(aod),
        };
        request = request.with_aerosol(observation);
    }

    Ok(request)
}

fn load_stations(path: &Path) -> Result<StaticStations, CliError> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(StaticStations::from_json(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> EstimateArgs {
        EstimateArgs {
            image: None,
            lat: None,
            lon: None,
            stations: None,
            aod: None,
            humidity: None,
            json: false,
        }
    }

    #[test]
    fn test_build_request_with_location_and_aod() {
        let request = build_request(&EstimateArgs {
            lat: Some(37.5),
            lon: Some(127.0),
            aod: Some(0.2),
            humidity: Some(70.0),
            ..args()
        })
        .unwrap();

        assert_eq!(request.location.map(|p| p.lat), Some(37.5));
        assert_eq!(request.aerosol.and_then(|a| a.humidity), Some(70.0));
        assert!(request.image.is_none());
    }

    #[test]
    fn test_out_of_range_latitude_rejected() {
        let err = build_request(&EstimateArgs {
            lat: Some(95.0),
            lon: Some(0.0),
            ..args()
        })
        .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_image_is_reported() {
        let err = build_request(&EstimateArgs {
            image: Some(PathBuf::from("/nonexistent/sky.jpg")),
            ..args()
        })
        .unwrap_err();
        assert!(matches!(err, CliError::Image { .. }));
    }

    #[test]
    fn test_image_is_decoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sky.png");
        image::RgbImage::from_pixel(8, 8, image::Rgb([90, 150, 230]))
            .save(&path)
            .unwrap();

        let request = build_request(&EstimateArgs {
            image: Some(path),
            ..args()
        })
        .unwrap();
        assert_eq!(request.image.map(|i| i.dimensions()), Some((8, 8)));
    }

    #[test]
    fn test_load_stations_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(
            &path,
            r#"[{"coordinate": {"lat": 37.56, "lon": 126.97}, "pm25": 30.0}]"#,
        )
        .unwrap();

        assert_eq!(load_stations(&path).unwrap().len(), 1);
        assert!(matches!(
            load_stations(&dir.path().join("missing.json")),
            Err(CliError::Io { .. })
        ));
    }
}
