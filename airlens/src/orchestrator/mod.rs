//! Concurrent estimation orchestrator.
//!
//! Runs the three tiers as concurrent futures, joins them at a single
//! barrier and fuses whatever came back:
//!
//! ```text
//!            ┌─ station   (source fetch, IDW) ───────────────┐
//! request ───┼─ camera    (blocking: features, camera model) ─┼── join ── fuse ── report
//!            └─ satellite (source fetch, AOD conversion) ─────┘
//! ```
//!
//! Each tier is bounded by its own deadline and raced against the request's
//! [`CancellationToken`]. A tier that errors, times out or is cancelled is
//! reported as [`TierOutcome::Unavailable`] and fusion proceeds on the rest.
//! Tiers share no mutable state; their results are read only after the join.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use airlens::coord::GeoPoint;
//! use airlens::config::EngineConfig;
//! use airlens::orchestrator::{EstimationOrchestrator, EstimationRequest, StaticStations};
//! use airlens::tier::{AerosolObservation, StationReading};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let here = GeoPoint::new(37.5665, 126.9780)?;
//! let stations = StaticStations::new(vec![StationReading::new(here, 30.0)]);
//!
//! let orchestrator = EstimationOrchestrator::new(EngineConfig::default())?
//!     .with_station_source(Arc::new(stations));
//!
//! let request = EstimationRequest::new()
//!     .with_location(here)
//!     .with_aerosol(AerosolObservation::new(0.2).with_humidity(70.0));
//!
//! let report = orchestrator.estimate(request, &CancellationToken::new()).await;
//! let fused = report.fused?;
//! assert_eq!(fused.sources_available(), 2);
//! # Ok(())
//! # }
//! ```

mod sources;
mod types;

pub use sources::{
    AtmosphereSource, BoxFuture, SourceError, StaticAerosol, StaticStations, StationSource,
};
pub use types::{
    EstimationReport, EstimationRequest, TierOutcome, TierTimeouts, UnavailableReason,
    DEFAULT_CAMERA_TIMEOUT, DEFAULT_SATELLITE_TIMEOUT, DEFAULT_STATION_TIMEOUT,
};

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::coord::GeoPoint;
use crate::error::EstimationResult;
use crate::features::FeatureExtractor;
use crate::fusion::FusionEngine;
use crate::tier::{
    AerosolObservation, CameraModel, HeuristicCameraModel, SatelliteEstimator, StationEstimator,
    TierResult, TierSource,
};

/// Runs one estimation request across all tiers.
///
/// Holds configuration and shared sources only; it is safe to share behind
/// an `Arc` and call concurrently.
pub struct EstimationOrchestrator {
    extractor: FeatureExtractor,
    camera: Arc<dyn CameraModel>,
    station: StationEstimator,
    satellite: SatelliteEstimator,
    fusion: FusionEngine,
    timeouts: TierTimeouts,
    stations: Option<Arc<dyn StationSource>>,
    atmosphere: Option<Arc<dyn AtmosphereSource>>,
}

impl EstimationOrchestrator {
    /// Creates an orchestrator using the heuristic camera model and no
    /// external sources.
    ///
    /// # Errors
    ///
    /// Returns `Config` if any part of `config` is invalid.
    pub fn new(config: EngineConfig) -> EstimationResult<Self> {
        config.validate()?;
        Ok(Self {
            extractor: FeatureExtractor::new(config.extractor),
            camera: Arc::new(HeuristicCameraModel::new(config.camera)?),
            station: StationEstimator::new(config.station)?,
            satellite: SatelliteEstimator::new(config.satellite)?,
            fusion: FusionEngine::new(config.fusion)?,
            timeouts: config.timeouts,
            stations: None,
            atmosphere: None,
        })
    }

    /// Replace the camera model.
    pub fn with_camera_model(mut self, model: Arc<dyn CameraModel>) -> Self {
        self.camera = model;
        self
    }

    /// Attach a station source.
    pub fn with_station_source(mut self, source: Arc<dyn StationSource>) -> Self {
        self.stations = Some(source);
        self
    }

    /// Attach an atmosphere source.
    pub fn with_atmosphere_source(mut self, source: Arc<dyn AtmosphereSource>) -> Self {
        self.atmosphere = Some(source);
        self
    }

    /// Name of the active camera model.
    pub fn camera_model(&self) -> &str {
        self.camera.name()
    }

    /// Active per-tier deadlines.
    pub fn timeouts(&self) -> &TierTimeouts {
        &self.timeouts
    }

    /// Run all tiers concurrently and fuse their results.
    ///
    /// Never fails as a whole: tier problems become unavailable outcomes and
    /// an all-unavailable request carries `NoUsableData` in
    /// [`EstimationReport::fused`].
    pub async fn estimate(
        &self,
        request: EstimationRequest,
        cancel: &CancellationToken,
    ) -> EstimationReport {
        let started = Instant::now();
        let EstimationRequest {
            location,
            image,
            aerosol,
        } = request;

        let (station, camera, satellite) = tokio::join!(
            run_tier(
                TierSource::Station,
                self.timeouts.station,
                cancel,
                self.station_tier(location),
            ),
            run_tier(
                TierSource::Camera,
                self.timeouts.camera,
                cancel,
                self.camera_tier(image),
            ),
            run_tier(
                TierSource::Satellite,
                self.timeouts.satellite,
                cancel,
                self.satellite_tier(location, aerosol),
            ),
        );

        let present: Vec<TierResult> = [&station, &camera, &satellite]
            .into_iter()
            .filter_map(TierOutcome::result)
            .copied()
            .collect();

        let fused = self.fusion.fuse(&present);
        match &fused {
            Ok(estimate) => debug!(
                sources = estimate.sources_available(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Estimation complete"
            ),
            Err(e) => warn!(
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Estimation produced no fused result"
            ),
        }

        EstimationReport {
            station,
            camera,
            satellite,
            fused,
        }
    }

    async fn station_tier(&self, location: Option<GeoPoint>) -> TierOutcome {
        let (Some(point), Some(source)) = (location, self.stations.as_ref()) else {
            return TierOutcome::unavailable(UnavailableReason::NoInput);
        };
        if let Err(e) = point.validate() {
            return TierOutcome::unavailable(UnavailableReason::InvalidInput(e.to_string()));
        }

        let readings = match source
            .nearby(point, self.station.config().search_radius_km)
            .await
        {
            Ok(readings) => readings,
            Err(SourceError::NoData) => {
                return TierOutcome::unavailable(UnavailableReason::NoStations)
            }
            Err(SourceError::Failed(message)) => {
                return TierOutcome::unavailable(UnavailableReason::SourceFailed(message))
            }
        };

        match self.station.estimate(point, &readings) {
            Ok(Some(result)) => TierOutcome::Available(result),
            Ok(None) => TierOutcome::unavailable(UnavailableReason::NoStations),
            Err(e) => TierOutcome::unavailable(UnavailableReason::from_error(e)),
        }
    }

    async fn camera_tier(&self, image: Option<RgbImage>) -> TierOutcome {
        let Some(image) = image else {
            return TierOutcome::unavailable(UnavailableReason::NoInput);
        };

        // Pixel work stays off the async workers. A blocking task cannot be
        // aborted, so on timeout it runs to completion and its result is dropped.
        let extractor = self.extractor.clone();
        let model = Arc::clone(&self.camera);
        let handle = tokio::task::spawn_blocking(move || {
            let features = extractor.extract(&image)?;
            model.estimate(&features)
        });

        match handle.await {
            Ok(result) => result.into(),
            Err(join_error) => TierOutcome::unavailable(UnavailableReason::SourceFailed(
                format!("camera task failed: {}", join_error),
            )),
        }
    }

    async fn satellite_tier(
        &self,
        location: Option<GeoPoint>,
        aerosol: Option<AerosolObservation>,
    ) -> TierOutcome {
        let observation = match (aerosol, location, self.atmosphere.as_ref()) {
            (Some(observation), _, _) => observation,
            (None, Some(point), Some(source)) => match source.aerosol(point).await {
                Ok(observation) => observation,
                Err(SourceError::NoData) => {
                    return TierOutcome::unavailable(UnavailableReason::NoInput)
                }
                Err(SourceError::Failed(message)) => {
                    return TierOutcome::unavailable(UnavailableReason::SourceFailed(message))
                }
            },
            _ => return TierOutcome::unavailable(UnavailableReason::NoInput),
        };

        self.satellite.estimate_observation(&observation).into()
    }
}

/// Bounds a tier by its deadline and the request's cancellation token.
async fn run_tier<F>(
    source: TierSource,
    deadline: Duration,
    cancel: &CancellationToken,
    tier: F,
) -> TierOutcome
where
    F: Future<Output = TierOutcome>,
{
    let outcome = tokio::select! {
        biased;

        _ = cancel.cancelled() => TierOutcome::unavailable(UnavailableReason::Cancelled),

        result = tokio::time::timeout(deadline, tier) => match result {
            Ok(outcome) => outcome,
            Err(_) => TierOutcome::unavailable(UnavailableReason::TimedOut),
        },
    };

    match &outcome {
        TierOutcome::Available(result) => debug!(
            tier = %source,
            pm25 = result.value(),
            confidence = result.confidence(),
            "Tier produced estimate"
        ),
        TierOutcome::Unavailable(reason) if reason.is_failure() => warn!(
            tier = %source,
            reason = %reason,
            timeout_ms = deadline.as_millis() as u64,
            "Tier unavailable"
        ),
        TierOutcome::Unavailable(reason) => info!(
            tier = %source,
            reason = %reason,
            "Tier skipped"
        ),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimationError;
    use crate::features::ImageFeatures;
    use crate::tier::StationReading;
    use image::Rgb;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn orchestrator() -> EstimationOrchestrator {
        EstimationOrchestrator::new(EngineConfig::default()).unwrap()
    }

    /// Station source that never answers within any sane deadline.
    struct StalledStations;

    impl StationSource for StalledStations {
        fn nearby(
            &self,
            _point: GeoPoint,
            _radius_km: f64,
        ) -> BoxFuture<'_, Result<Vec<StationReading>, SourceError>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            })
        }
    }

    struct FailingStations;

    impl StationSource for FailingStations {
        fn nearby(
            &self,
            _point: GeoPoint,
            _radius_km: f64,
        ) -> BoxFuture<'_, Result<Vec<StationReading>, SourceError>> {
            Box::pin(async { Err(SourceError::Failed("HTTP 503".into())) })
        }
    }

    struct CountingModel {
        calls: AtomicUsize,
    }

    impl CameraModel for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        fn estimate(&self, _features: &ImageFeatures) -> EstimationResult<TierResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            TierResult::new(TierSource::Camera, 40.0, 0.9)
        }
    }

    #[tokio::test]
    async fn test_empty_request_is_no_usable_data() {
        let report = orchestrator()
            .estimate(EstimationRequest::new(), &CancellationToken::new())
            .await;

        for (_, outcome) in report.outcomes() {
            assert_eq!(outcome.reason(), Some(&UnavailableReason::NoInput));
        }
        assert_eq!(report.fused, Err(EstimationError::NoUsableData));
    }

    #[tokio::test]
    async fn test_satellite_only() {
        let request =
            EstimationRequest::new().with_aerosol(AerosolObservation::new(0.2).with_humidity(70.0));
        let report = orchestrator()
            .estimate(request, &CancellationToken::new())
            .await;

        let fused = report.estimate().unwrap();
        assert!((fused.pm25() - 34.8).abs() < 1e-9);
        assert_eq!(fused.sources_available(), 1);
    }

    #[tokio::test]
    async fn test_empty_station_list_is_unavailable() {
        let here = point(37.5665, 126.9780);
        let orchestrator =
            orchestrator().with_station_source(Arc::new(StaticStations::new(Vec::new())));
        let request = EstimationRequest::new()
            .with_location(here)
            .with_aerosol(AerosolObservation::new(0.2));

        let report = orchestrator.estimate(request, &CancellationToken::new()).await;

        assert_eq!(report.station.reason(), Some(&UnavailableReason::NoStations));
        let fused = report.estimate().unwrap();
        assert_eq!(fused.weights().satellite, Some(1.0));
        assert!(fused.breakdown().station.is_none());
    }

    #[tokio::test]
    async fn test_station_source_failure_is_isolated() {
        let orchestrator = orchestrator().with_station_source(Arc::new(FailingStations));
        let request = EstimationRequest::new()
            .with_location(point(10.0, 10.0))
            .with_aerosol(AerosolObservation::new(0.1));

        let report = orchestrator.estimate(request, &CancellationToken::new()).await;

        assert_eq!(
            report.station.reason(),
            Some(&UnavailableReason::SourceFailed("HTTP 503".into()))
        );
        assert!(report.satellite.is_available());
        assert!(report.fused.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_aod_fails_only_satellite() {
        let image = RgbImage::from_pixel(32, 32, Rgb([90, 150, 230]));
        let request = EstimationRequest::new()
            .with_image(image)
            .with_aerosol(AerosolObservation::new(-1.0));

        let report = orchestrator()
            .estimate(request, &CancellationToken::new())
            .await;

        assert!(matches!(
            report.satellite.reason(),
            Some(UnavailableReason::InvalidInput(_))
        ));
        assert!(report.camera.is_available());
        assert_eq!(report.estimate().unwrap().sources_available(), 1);
    }

    #[tokio::test]
    async fn test_empty_image_fails_only_camera() {
        let request = EstimationRequest::new()
            .with_image(RgbImage::new(0, 0))
            .with_aerosol(AerosolObservation::new(0.2));

        let report = orchestrator()
            .estimate(request, &CancellationToken::new())
            .await;

        assert!(matches!(
            report.camera.reason(),
            Some(UnavailableReason::InvalidInput(_))
        ));
        assert!(report.fused.is_ok());
    }

    #[tokio::test]
    async fn test_custom_camera_model_is_used() {
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
        });
        let orchestrator = orchestrator().with_camera_model(model.clone());
        assert_eq!(orchestrator.camera_model(), "counting");

        let request =
            EstimationRequest::new().with_image(RgbImage::from_pixel(8, 8, Rgb([100, 100, 100])));
        let report = orchestrator.estimate(request, &CancellationToken::new()).await;

        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.camera.result().map(TierResult::value), Some(40.0));
    }

    #[tokio::test]
    async fn test_stalled_station_times_out() {
        let config = EngineConfig {
            timeouts: TierTimeouts::default().with_station(Duration::from_millis(50)),
            ..Default::default()
        };
        let orchestrator = EstimationOrchestrator::new(config)
            .unwrap()
            .with_station_source(Arc::new(StalledStations));
        let request = EstimationRequest::new()
            .with_location(point(37.0, 127.0))
            .with_aerosol(AerosolObservation::new(0.2));

        let started = Instant::now();
        let report = orchestrator.estimate(request, &CancellationToken::new()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.station.reason(), Some(&UnavailableReason::TimedOut));
        assert!(report.satellite.is_available());
        assert!(report.fused.is_ok());
    }

    #[tokio::test]
    async fn test_cancellation_marks_pending_tiers() {
        let orchestrator = orchestrator().with_station_source(Arc::new(StalledStations));
        let cancel = CancellationToken::new();
        let request = EstimationRequest::new().with_location(point(37.0, 127.0));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let report = orchestrator.estimate(request, &cancel).await;

        assert_eq!(report.station.reason(), Some(&UnavailableReason::Cancelled));
        assert_eq!(report.fused, Err(EstimationError::NoUsableData));
    }

    #[tokio::test]
    async fn test_already_cancelled_request() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = EstimationRequest::new().with_aerosol(AerosolObservation::new(0.2));

        let report = orchestrator().estimate(request, &cancel).await;

        for (_, outcome) in report.outcomes() {
            assert_eq!(outcome.reason(), Some(&UnavailableReason::Cancelled));
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.fusion.tight_bonus = 0.0;
        assert!(EstimationOrchestrator::new(config).is_err());
    }
}
