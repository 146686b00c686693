//! Multi-tier fusion.
//!
//! Combines the results of whichever tiers are present into one
//! [`FusedEstimate`]:
//!
//! ```text
//! w_i          = conf_i / Σ conf                  (weights sum to 1)
//! pm25         = Σ w_i · value_i
//! uncertainty  = population stddev of value_i     (inter-source disagreement)
//! base         = mean(conf_i)
//! confidence   = min(0.98, base + agreement_bonus(uncertainty))
//! ```
//!
//! The agreement bonus is +0.15 below 5 µg/m³ of disagreement, +0.10 below
//! 10 µg/m³, else nothing. Thresholds and bonuses are configurable through
//! [`FusionConfig`] but must stay monotonic.
//!
//! The engine is a pure function of its inputs; it holds only its config.

mod engine;
mod types;

pub use engine::{FusionConfig, FusionEngine};
pub use types::{FusedEstimate, TierBreakdown, TierWeights};
