//! AirLens - multi-tier PM2.5 estimation
//!
//! Estimates ambient PM2.5 by fusing up to three independent estimators:
//!
//! - **Station tier**: inverse-distance-weighted interpolation of nearby
//!   ground monitoring stations
//! - **Camera tier**: regression from features of a sky photograph
//! - **Satellite tier**: conversion of aerosol optical depth
//!
//! Each tier yields a [`TierResult`] or nothing. The [`FusionEngine`]
//! combines whatever is present into a [`FusedEstimate`] with a
//! confidence-weighted value, an inter-tier uncertainty and a confidence
//! that rises when the tiers agree.
//!
//! [`EstimationOrchestrator`] runs the tiers concurrently under per-tier
//! timeouts and a cancellation token, then fuses the results.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`features`] | Sky image feature extraction |
//! | [`tier`] | The three tier estimators |
//! | [`fusion`] | Fusion engine |
//! | [`orchestrator`] | Concurrent fan-out/fan-in and data source traits |
//! | [`cache`] | TTL cache decorator for station sources |
//! | [`aqi`] | EPA category and sky description |
//! | [`config`] | Engine configuration and INI file |
//! | [`coord`] | Geographic points and haversine distance |
//! | [`logging`] | `tracing` subscriber setup |

pub mod aqi;
pub mod cache;
pub mod config;
pub mod coord;
pub mod error;
pub mod features;
pub mod fusion;
pub mod logging;
pub mod orchestrator;
pub mod tier;

pub use error::{EstimationError, EstimationResult};
pub use fusion::{FusedEstimate, FusionEngine};
pub use orchestrator::{EstimationOrchestrator, EstimationReport, EstimationRequest};
pub use tier::{TierResult, TierSource};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
