//! Leafscan Guard
//!
//! Plant-validity guard strategies for the diagnosis pipeline. Both
//! strategies produce the same `GuardVerdict` contract:
//! - The semantic guard screens raw image bytes with a zero-shot
//!   vision-language capability before any classification work.
//! - The statistical guard votes over the classifier's own probability
//!   distribution after ranking, using peak confidence, normalized
//!   entropy, and top-1/top-2 margin.
//!
//! The orchestrator consumes only the verdicts, never strategy internals,
//! so deployments can swap strategies through configuration alone.

pub mod semantic;
pub mod statistical;

pub use semantic::{
    all_prompts, SemanticGuard, SemanticGuardConfig, ZeroShotScorer, NON_PLANT_PROMPTS,
    PLANT_PROMPTS,
};
pub use statistical::{StatisticalGuard, StatisticalGuardConfig};

use leafscan_core::{GuardVerdict, Result};

/// Fixed user-facing message for any guard rejection
pub const REJECTION_MESSAGE: &str = "This image does not appear to contain a recognizable plant \
     leaf. Please upload a clear photo of a plant leaf for disease diagnosis.";

/// The active guard strategy for a deployment. At most one variant is
/// active; each hook is a no-op for the strategies that do not own it.
pub enum PlantGuard {
    /// No validity screening
    Disabled,

    /// Vote over the ranked probability distribution, after classification
    Statistical(StatisticalGuard),

    /// Zero-shot semantic screening of raw bytes, before classification
    Semantic(SemanticGuard),
}

impl PlantGuard {
    /// Guard hook that runs on raw bytes before preprocessing. Only the
    /// semantic strategy does work here.
    pub async fn pre_classification(&self, image: &[u8]) -> Result<GuardVerdict> {
        match self {
            Self::Semantic(guard) => guard.check(image).await,
            Self::Disabled | Self::Statistical(_) => Ok(GuardVerdict::accepted()),
        }
    }

    /// Guard hook that runs on the probability vector after ranking. Only
    /// the statistical strategy does work here.
    pub fn post_ranking(&self, probs: &[f32]) -> GuardVerdict {
        match self {
            Self::Statistical(guard) => guard.check(probs),
            Self::Disabled | Self::Semantic(_) => GuardVerdict::accepted(),
        }
    }

    /// Strategy name for logs and the health endpoint
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Statistical(_) => "statistical",
            Self::Semantic(_) => "semantic",
        }
    }
}
