//! Semantic plant-validity guard
//!
//! Screens the raw image against natural-language prompt sets with a
//! zero-shot vision-language capability before any classification work.
//! Plant-positive prompts come first; everything else is negative.

use crate::REJECTION_MESSAGE;
use async_trait::async_trait;
use leafscan_core::{softmax, GuardVerdict, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prompts describing a valid input
pub const PLANT_PROMPTS: [&str; 3] = [
    "a photo of a plant leaf",
    "a photo of a diseased plant leaf",
    "a photo of a healthy green leaf",
];

/// Prompts covering common non-plant subjects
pub const NON_PLANT_PROMPTS: [&str; 10] = [
    "a photo of a dog",
    "a photo of a cat",
    "a photo of a person",
    "a photo of a car",
    "a photo of a building",
    "a photo of food on a plate",
    "a photo of an electronic device",
    "a photo of furniture",
    "a photo of a landscape without plants",
    "a photo of text or a document",
];

/// Every prompt the guard scores, plant-positive first
pub fn all_prompts() -> Vec<&'static str> {
    PLANT_PROMPTS
        .iter()
        .chain(NON_PLANT_PROMPTS.iter())
        .copied()
        .collect()
}

/// Zero-shot image/text similarity capability
///
/// Implementations return one raw similarity logit per prompt, in prompt
/// order. The guard owns the softmax and thresholding.
#[async_trait]
pub trait ZeroShotScorer: Send + Sync {
    async fn similarity_scores(&self, image: &[u8], prompts: &[&str]) -> Result<Vec<f32>>;

    /// Capability name for logging
    fn name(&self) -> &str;
}

/// Configuration for the semantic guard
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SemanticGuardConfig {
    /// Minimum probability mass on plant prompts to accept the image
    #[serde(default = "default_plant_probability_threshold")]
    pub plant_probability_threshold: f64,
}

impl Default for SemanticGuardConfig {
    fn default() -> Self {
        Self {
            plant_probability_threshold: default_plant_probability_threshold(),
        }
    }
}

fn default_plant_probability_threshold() -> f64 {
    0.5
}

/// Early-stage guard over the raw image bytes
pub struct SemanticGuard {
    scorer: Box<dyn ZeroShotScorer>,
    config: SemanticGuardConfig,
}

impl SemanticGuard {
    pub fn new(scorer: Box<dyn ZeroShotScorer>, config: SemanticGuardConfig) -> Self {
        Self { scorer, config }
    }

    /// Check whether the image plausibly depicts a plant leaf.
    ///
    /// Softmaxes the similarity logits over the combined prompt set and
    /// sums the mass assigned to the plant-positive prompts.
    pub async fn check(&self, image: &[u8]) -> Result<GuardVerdict> {
        let prompts = all_prompts();
        let scores = self.scorer.similarity_scores(image, &prompts).await?;

        if scores.len() != prompts.len() {
            return Err(leafscan_core::Error::inference(format!(
                "zero-shot scorer returned {} scores for {} prompts",
                scores.len(),
                prompts.len()
            )));
        }

        let probs = softmax(&scores);
        let plant_prob: f64 = probs[..PLANT_PROMPTS.len()]
            .iter()
            .map(|&p| p as f64)
            .sum();

        debug!(
            scorer = self.scorer.name(),
            plant_prob, "semantic guard plant probability"
        );

        if plant_prob < self.config.plant_probability_threshold {
            Ok(GuardVerdict::rejected(REJECTION_MESSAGE))
        } else {
            Ok(GuardVerdict::accepted())
        }
    }
}
