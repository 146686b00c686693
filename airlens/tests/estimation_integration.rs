//! Integration tests for the estimation pipeline.
//!
//! These tests drive the public API end to end:
//! - static sources → orchestrator → fused report
//! - timeouts and cancellation isolating single tiers
//! - the station cache decorator in front of a source
//! - configuration files feeding the engine
//!
//! Run with: `cargo test --test estimation_integration`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use tokio_util::sync::CancellationToken;

use airlens::aqi::AqiLevel;
use airlens::cache::CachedStationSource;
use airlens::config::{ConfigFile, EngineConfig};
use airlens::coord::{GeoPoint, KM_PER_DEGREE};
use airlens::orchestrator::{
    AtmosphereSource, BoxFuture, EstimationOrchestrator, EstimationRequest, SourceError,
    StaticAerosol, StaticStations, StationSource, TierTimeouts, UnavailableReason,
};
use airlens::tier::{AerosolObservation, StationReading, TierSource};
use airlens::EstimationError;

// ============================================================================
// Helper Functions
// ============================================================================

/// Seoul city hall.
fn seoul() -> GeoPoint {
    GeoPoint::new(37.5665, 126.9780).unwrap()
}

/// A point `km` north of `origin`.
fn north_of(origin: GeoPoint, km: f64) -> GeoPoint {
    // haversine uses 6371 km, so one degree of latitude is ~111.19 km
    let degrees = km / (6371.0 * std::f64::consts::PI / 180.0);
    GeoPoint::new(origin.lat + degrees, origin.lon).unwrap()
}

fn blue_sky() -> RgbImage {
    RgbImage::from_pixel(120, 80, Rgb([90, 150, 230]))
}

fn seoul_stations() -> StaticStations {
    let here = seoul();
    StaticStations::new(vec![
        StationReading::new(here, 30.0).with_name("Jung-gu"),
        StationReading::new(north_of(here, 5.0), 40.0).with_name("Jongno-gu"),
        StationReading::new(north_of(here, 12.0), 45.0).with_name("Dobong-gu"),
    ])
}

/// Station source that counts fetches.
struct CountingStations {
    inner: StaticStations,
    calls: AtomicUsize,
}

impl StationSource for CountingStations {
    fn nearby(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<StationReading>, SourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.nearby(point, radius_km)
    }
}

/// Atmosphere source that answers after `delay`.
struct SlowAtmosphere {
    delay: Duration,
}

impl AtmosphereSource for SlowAtmosphere {
    fn aerosol(&self, _point: GeoPoint) -> BoxFuture<'_, Result<AerosolObservation, SourceError>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(AerosolObservation::new(0.3))
        })
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_three_tier_estimate() {
    let orchestrator = EstimationOrchestrator::new(EngineConfig::default())
        .unwrap()
        .with_station_source(Arc::new(seoul_stations()))
        .with_atmosphere_source(Arc::new(StaticAerosol::new(
            AerosolObservation::new(0.2).with_humidity(70.0),
        )));

    let request = EstimationRequest::new()
        .with_location(seoul())
        .with_image(blue_sky());
    let report = orchestrator
        .estimate(request, &CancellationToken::new())
        .await;

    for (source, outcome) in report.outcomes() {
        assert!(outcome.is_available(), "{} tier unavailable: {:?}", source, outcome);
    }

    let fused = report.estimate().expect("fusion should succeed");
    assert_eq!(fused.sources_available(), 3);
    assert!((fused.weights().total() - 1.0).abs() < 1e-9);
    assert!(fused.confidence() <= 0.98);

    let values: Vec<f64> = fused.breakdown().present().map(|r| r.value()).collect();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(fused.pm25() >= min - 1e-9 && fused.pm25() <= max + 1e-9);

    let satellite = fused.breakdown().get(TierSource::Satellite).unwrap();
    assert!((satellite.value() - 34.8).abs() < 1e-9);
    assert_eq!(satellite.confidence(), 0.75);
}

#[tokio::test]
async fn test_station_at_query_point_dominates() {
    let here = seoul();
    let stations = StaticStations::new(vec![
        StationReading::new(here, 30.0),
        StationReading::new(north_of(here, 5.0), 40.0),
    ]);
    let orchestrator = EstimationOrchestrator::new(EngineConfig::default())
        .unwrap()
        .with_station_source(Arc::new(stations));

    let report = orchestrator
        .estimate(
            EstimationRequest::new().with_location(here),
            &CancellationToken::new(),
        )
        .await;

    let station = report.station.result().unwrap();
    assert!((station.value() - 30.0).abs() < 0.05, "got {}", station.value());
    assert!((station.confidence() - 0.9).abs() < 1e-9);

    // Single tier: fused value equals the tier value, no spread
    let fused = report.estimate().unwrap();
    assert_eq!(fused.pm25(), station.value());
    assert_eq!(fused.uncertainty(), 0.0);
}

#[tokio::test]
async fn test_nothing_available_reports_every_reason() {
    let orchestrator = EstimationOrchestrator::new(EngineConfig::default())
        .unwrap()
        .with_station_source(Arc::new(StaticStations::default()))
        .with_atmosphere_source(Arc::new(StaticAerosol::empty()));

    let report = orchestrator
        .estimate(
            EstimationRequest::new().with_location(seoul()),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.station.reason(), Some(&UnavailableReason::NoStations));
    assert_eq!(report.camera.reason(), Some(&UnavailableReason::NoInput));
    assert_eq!(report.satellite.reason(), Some(&UnavailableReason::NoInput));
    assert_eq!(report.fused, Err(EstimationError::NoUsableData));
}

#[tokio::test]
async fn test_slow_source_times_out_without_blocking_others() {
    let config = EngineConfig::default()
        .with_timeouts(TierTimeouts::default().with_satellite(Duration::from_millis(50)));
    let orchestrator = EstimationOrchestrator::new(config)
        .unwrap()
        .with_station_source(Arc::new(seoul_stations()))
        .with_atmosphere_source(Arc::new(SlowAtmosphere {
            delay: Duration::from_secs(30),
        }));

    let started = Instant::now();
    let report = orchestrator
        .estimate(
            EstimationRequest::new().with_location(seoul()),
            &CancellationToken::new(),
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.satellite.reason(), Some(&UnavailableReason::TimedOut));
    let fused = report.estimate().unwrap();
    assert_eq!(fused.sources_available(), 1);
    assert!(fused.breakdown().station.is_some());
}

#[tokio::test]
async fn test_cancellation_stops_waiting() {
    let orchestrator = EstimationOrchestrator::new(EngineConfig::default())
        .unwrap()
        .with_station_source(Arc::new(seoul_stations()))
        .with_atmosphere_source(Arc::new(SlowAtmosphere {
            delay: Duration::from_secs(3),
        }));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = orchestrator
        .estimate(EstimationRequest::new().with_location(seoul()), &cancel)
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.satellite.reason(), Some(&UnavailableReason::Cancelled));
    // The station tier finished before the cancel and still counts
    assert!(report.station.is_available());
    assert!(report.fused.is_ok());
}

#[tokio::test]
async fn test_cached_station_source_behind_orchestrator() {
    let counting = Arc::new(CountingStations {
        inner: seoul_stations(),
        calls: AtomicUsize::new(0),
    });
    let cached = CachedStationSource::new(counting.clone(), Duration::from_secs(300), 100);
    let orchestrator = Arc::new(
        EstimationOrchestrator::new(EngineConfig::default())
            .unwrap()
            .with_station_source(Arc::new(cached)),
    );

    // Two requests a few metres apart land in the same cache cell
    let first = orchestrator
        .estimate(
            EstimationRequest::new().with_location(seoul()),
            &CancellationToken::new(),
        )
        .await;
    let nearby = GeoPoint::new(37.5666, 126.9781).unwrap();
    let second = orchestrator
        .estimate(
            EstimationRequest::new().with_location(nearby),
            &CancellationToken::new(),
        )
        .await;

    assert!(first.station.is_available());
    assert!(second.station.is_available());
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_orchestrator() {
    let orchestrator = Arc::new(
        EstimationOrchestrator::new(EngineConfig::default())
            .unwrap()
            .with_station_source(Arc::new(seoul_stations())),
    );

    let requests = (0..8).map(|i| {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            let request = EstimationRequest::new()
                .with_location(seoul())
                .with_aerosol(AerosolObservation::new(0.05 * i as f64));
            orchestrator
                .estimate(request, &CancellationToken::new())
                .await
        }
    });
    let reports = futures::future::join_all(requests).await;

    assert_eq!(reports.len(), 8);
    for report in &reports {
        assert_eq!(report.estimate().unwrap().sources_available(), 2);
    }
    // Station result is identical across requests; only satellite input varies
    let station_values: Vec<f64> = reports
        .iter()
        .map(|r| r.station.result().unwrap().value())
        .collect();
    assert!(station_values.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_config_file_drives_engine() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.ini");
    // A 1 km radius leaves only the co-located station
    std::fs::write(&path, "[station]\nsearch_radius_km = 1\n\n[satellite]\nslope = 100\n").unwrap();

    let config = ConfigFile::load_from(&path).unwrap();
    let orchestrator = EstimationOrchestrator::new(config.to_engine_config().unwrap())
        .unwrap()
        .with_station_source(Arc::new(seoul_stations()));

    let report = orchestrator
        .estimate(
            EstimationRequest::new()
                .with_location(seoul())
                .with_aerosol(AerosolObservation::new(0.2)),
            &CancellationToken::new(),
        )
        .await;

    assert!((report.station.result().unwrap().value() - 30.0).abs() < 1e-9);
    // 100·0.2 + 5
    assert!((report.satellite.result().unwrap().value() - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let orchestrator = EstimationOrchestrator::new(EngineConfig::default()).unwrap();
    let report = orchestrator
        .estimate(
            EstimationRequest::new().with_aerosol(AerosolObservation::new(0.2).with_humidity(70.0)),
            &CancellationToken::new(),
        )
        .await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["satellite"]["status"], "available");
    assert_eq!(json["satellite"]["detail"]["source"], "satellite");
    assert_eq!(json["camera"]["detail"]["reason"], "no_input");
    assert!(json["fused"]["Ok"]["pm25"].as_f64().is_some());

    let pm25 = report.estimate().unwrap().pm25();
    assert_eq!(AqiLevel::from_pm25(pm25), AqiLevel::Moderate);
}

#[test]
fn test_north_of_helper_distance() {
    let here = seoul();
    let there = north_of(here, 5.0);
    assert!((here.distance_km(&there) - 5.0).abs() < 1e-6);
    // Bounding boxes use the coarser 111 km/degree
    assert!(KM_PER_DEGREE < 111.2);
}
