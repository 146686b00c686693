//! Fusion engine.

use tracing::{debug, info};

use super::types::{FusedEstimate, TierBreakdown, TierWeights};
use crate::error::{EstimationError, EstimationResult};
use crate::tier::TierResult;

/// Agreement thresholds, bonuses and the confidence ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Uncertainty below this earns `tight_bonus` (µg/m³).
    pub tight_threshold: f64,
    /// Bonus for tight agreement.
    pub tight_bonus: f64,
    /// Uncertainty below this (but not below `tight_threshold`) earns `loose_bonus`.
    pub loose_threshold: f64,
    /// Bonus for loose agreement.
    pub loose_bonus: f64,
    /// Upper bound on the final confidence.
    pub max_confidence: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            tight_threshold: 5.0,
            tight_bonus: 0.15,
            loose_threshold: 10.0,
            loose_bonus: 0.10,
            max_confidence: 0.98,
        }
    }
}

impl FusionConfig {
    /// Checks the bonus schedule is monotonic and the ceiling is a probability.
    ///
    /// Monotonic means a smaller uncertainty can never earn a smaller bonus.
    pub fn validate(&self) -> EstimationResult<()> {
        if !(self.tight_threshold >= 0.0 && self.tight_threshold <= self.loose_threshold) {
            return Err(EstimationError::Config(format!(
                "fusion thresholds must satisfy 0 <= tight <= loose, got tight={} loose={}",
                self.tight_threshold, self.loose_threshold
            )));
        }
        if !(self.loose_bonus >= 0.0 && self.tight_bonus >= self.loose_bonus) {
            return Err(EstimationError::Config(format!(
                "fusion bonuses must satisfy tight >= loose >= 0, got tight={} loose={}",
                self.tight_bonus, self.loose_bonus
            )));
        }
        if !(0.0..=1.0).contains(&self.max_confidence) {
            return Err(EstimationError::Config(format!(
                "fusion max confidence must be in [0, 1], got {}",
                self.max_confidence
            )));
        }
        Ok(())
    }

    /// Bonus earned for a given inter-tier uncertainty.
    pub fn agreement_bonus(&self, uncertainty: f64) -> f64 {
        if uncertainty < self.tight_threshold {
            self.tight_bonus
        } else if uncertainty < self.loose_threshold {
            self.loose_bonus
        } else {
            0.0
        }
    }
}

/// Stateless fusion of tier results.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self {
            config: FusionConfig::default(),
        }
    }
}

impl FusionEngine {
    /// Creates an engine after validating `config`.
    pub fn new(config: FusionConfig) -> EstimationResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse the present tier results.
    ///
    /// Absent tiers are simply not in `results`.
    ///
    /// # Errors
    ///
    /// - `NoUsableData` if `results` is empty or every confidence is zero
    /// - `InvalidInput` if two results come from the same tier
    pub fn fuse(&self, results: &[TierResult]) -> EstimationResult<FusedEstimate> {
        let mut breakdown = TierBreakdown::default();
        for result in results {
            let slot = breakdown.slot_mut(result.source());
            if slot.is_some() {
                return Err(EstimationError::invalid(format!(
                    "duplicate {} tier result",
                    result.source()
                )));
            }
            *slot = Some(*result);
        }

        let total_confidence: f64 = results.iter().map(TierResult::confidence).sum();
        if results.is_empty() || total_confidence <= 0.0 {
            return Err(EstimationError::NoUsableData);
        }

        let mut weights = TierWeights::default();
        let mut pm25 = 0.0;
        for result in results {
            let weight = result.confidence() / total_confidence;
            *weights.slot_mut(result.source()) = Some(weight);
            pm25 += result.value() * weight;
        }

        let n = results.len() as f64;
        let mean = results.iter().map(TierResult::value).sum::<f64>() / n;
        let uncertainty = (results
            .iter()
            .map(|r| (r.value() - mean).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();

        let base_confidence = total_confidence / n;
        let bonus = self.config.agreement_bonus(uncertainty);
        let confidence = (base_confidence + bonus).min(self.config.max_confidence);

        debug!(
            tiers = results.len(),
            mean,
            base_confidence,
            bonus,
            "Fusion intermediates"
        );
        info!(
            pm25 = format!("{:.1}", pm25),
            uncertainty = format!("{:.1}", uncertainty),
            confidence = format!("{:.2}", confidence),
            sources = results.len(),
            "Fused PM2.5 estimate"
        );

        Ok(FusedEstimate::new(
            pm25,
            uncertainty,
            confidence,
            breakdown,
            weights,
        ))
    }
}
