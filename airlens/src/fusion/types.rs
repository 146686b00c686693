//! Fusion output types.

use serde::Serialize;

use crate::tier::{TierResult, TierSource};

/// Per-tier results that took part in a fusion.
///
/// A field is `Some` only when that tier actually produced a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TierBreakdown {
    /// Station tier result.
    pub station: Option<TierResult>,
    /// Camera tier result.
    pub camera: Option<TierResult>,
    /// Satellite tier result.
    pub satellite: Option<TierResult>,
}

impl TierBreakdown {
    /// The result for `source`, if present.
    pub fn get(&self, source: TierSource) -> Option<&TierResult> {
        match source {
            TierSource::Station => self.station.as_ref(),
            TierSource::Camera => self.camera.as_ref(),
            TierSource::Satellite => self.satellite.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, source: TierSource) -> &mut Option<TierResult> {
        match source {
            TierSource::Station => &mut self.station,
            TierSource::Camera => &mut self.camera,
            TierSource::Satellite => &mut self.satellite,
        }
    }

    /// Present results in station, camera, satellite order.
    pub fn present(&self) -> impl Iterator<Item = &TierResult> {
        [&self.station, &self.camera, &self.satellite]
            .into_iter()
            .filter_map(Option::as_ref)
    }

    /// Number of tiers present.
    pub fn len(&self) -> usize {
        self.present().count()
    }

    /// True when no tier is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalised fusion weight per present tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TierWeights {
    /// Station weight.
    pub station: Option<f64>,
    /// Camera weight.
    pub camera: Option<f64>,
    /// Satellite weight.
    pub satellite: Option<f64>,
}

impl TierWeights {
    /// Weight for `source`, if that tier took part.
    pub fn get(&self, source: TierSource) -> Option<f64> {
        match source {
            TierSource::Station => self.station,
            TierSource::Camera => self.camera,
            TierSource::Satellite => self.satellite,
        }
    }

    pub(crate) fn slot_mut(&mut self, source: TierSource) -> &mut Option<f64> {
        match source {
            TierSource::Station => &mut self.station,
            TierSource::Camera => &mut self.camera,
            TierSource::Satellite => &mut self.satellite,
        }
    }

    /// Sum of present weights; 1 for any successful fusion.
    pub fn total(&self) -> f64 {
        [self.station, self.camera, self.satellite]
            .into_iter()
            .flatten()
            .sum()
    }
}

/// The fused PM2.5 estimate.
///
/// Built once by [`crate::fusion::FusionEngine::fuse`] and read-only after.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusedEstimate {
    pm25: f64,
    uncertainty: f64,
    confidence: f64,
    breakdown: TierBreakdown,
    weights: TierWeights,
}

impl FusedEstimate {
    pub(crate) fn new(
        pm25: f64,
        uncertainty: f64,
        confidence: f64,
        breakdown: TierBreakdown,
        weights: TierWeights,
    ) -> Self {
        Self {
            pm25,
            uncertainty,
            confidence,
            breakdown,
            weights,
        }
    }

    /// Confidence-weighted PM2.5 in µg/m³.
    pub fn pm25(&self) -> f64 {
        self.pm25
    }

    /// Disagreement between tiers (population stddev, µg/m³).
    ///
    /// This is a spread of point estimates, not a statistical interval.
    pub fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    /// Final confidence after the agreement bonus.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Tiers that contributed.
    pub fn breakdown(&self) -> &TierBreakdown {
        &self.breakdown
    }

    /// Weight each contributing tier received.
    pub fn weights(&self) -> &TierWeights {
        &self.weights
    }

    /// How many of the three tiers contributed.
    pub fn sources_available(&self) -> usize {
        self.breakdown.len()
    }
}
