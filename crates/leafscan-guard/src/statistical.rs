//! Statistical plant-validity guard
//!
//! Flags out-of-distribution inputs using only the classifier's own
//! probability distribution: low peak confidence, high normalized entropy,
//! and a thin top-1/top-2 margin each cast one vote, and two votes reject.

use crate::REJECTION_MESSAGE;
use leafscan_core::{normalized_entropy, GuardVerdict};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Thresholds for the three uncertainty signals
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatisticalGuardConfig {
    /// Top-1 probability below this flags the prediction
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Normalized entropy above this flags the prediction
    #[serde(default = "default_entropy_threshold")]
    pub entropy_threshold: f64,

    /// Top-1 minus top-2 probability below this flags the prediction
    #[serde(default = "default_margin_threshold")]
    pub margin_threshold: f64,
}

impl Default for StatisticalGuardConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            entropy_threshold: default_entropy_threshold(),
            margin_threshold: default_margin_threshold(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_entropy_threshold() -> f64 {
    0.8
}

fn default_margin_threshold() -> f64 {
    0.1
}

/// Late-stage guard over the ranked probability vector
#[derive(Debug, Clone, Default)]
pub struct StatisticalGuard {
    config: StatisticalGuardConfig,
}

impl StatisticalGuard {
    pub fn new(config: StatisticalGuardConfig) -> Self {
        Self { config }
    }

    /// Check a probability distribution produced by the classifier.
    ///
    /// The vector does not need to be sorted; the guard finds the two
    /// largest entries itself.
    pub fn check(&self, probs: &[f32]) -> GuardVerdict {
        let (max_conf, second) = top_two(probs);
        let margin = max_conf - second;
        let entropy = normalized_entropy(probs);

        let mut flags = 0u8;
        if max_conf < self.config.confidence_threshold {
            flags += 1;
        }
        if entropy > self.config.entropy_threshold {
            flags += 1;
        }
        if margin < self.config.margin_threshold {
            flags += 1;
        }

        debug!(
            max_conf,
            margin, entropy, flags, "statistical guard signals"
        );

        if flags >= 2 {
            GuardVerdict::rejected(REJECTION_MESSAGE)
        } else {
            GuardVerdict::accepted()
        }
    }
}

/// Largest and second-largest entries of the distribution
fn top_two(probs: &[f32]) -> (f64, f64) {
    let mut first = 0.0f64;
    let mut second = 0.0f64;
    for &p in probs {
        let p = p as f64;
        if p > first {
            second = first;
            first = p;
        } else if p > second {
            second = p;
        }
    }
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(head: &[f32], n: usize) -> Vec<f32> {
        let mut v = head.to_vec();
        v.resize(n, 0.0);
        v
    }

    #[test]
    fn confident_peaked_prediction_is_accepted() {
        let guard = StatisticalGuard::default();
        let probs = padded(&[0.92, 0.05, 0.03], 38);
        assert!(guard.check(&probs).accepted);
    }

    #[test]
    fn indecisive_distribution_is_rejected_by_two_votes() {
        // max_conf 0.34 < 0.5 and margin 0.01 < 0.1 both flag, which is
        // already a majority regardless of the entropy signal.
        let guard = StatisticalGuard::default();
        let probs = padded(&[0.34, 0.33, 0.33], 38);
        let verdict = guard.check(&probs);
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason.as_deref(), Some(REJECTION_MESSAGE));
    }

    #[test]
    fn single_flag_is_not_enough() {
        // Thin margin but confident and low-entropy: one vote, accepted.
        let guard = StatisticalGuard::new(StatisticalGuardConfig {
            confidence_threshold: 0.5,
            entropy_threshold: 0.8,
            margin_threshold: 0.1,
        });
        let probs = padded(&[0.52, 0.45, 0.03], 38);
        assert!(guard.check(&probs).accepted);
    }

    #[test]
    fn one_hot_distribution_is_accepted() {
        let guard = StatisticalGuard::default();
        let mut probs = vec![0.0f32; 38];
        probs[11] = 1.0;
        assert!(guard.check(&probs).accepted);
    }

    #[test]
    fn near_uniform_distribution_is_rejected() {
        let guard = StatisticalGuard::default();
        let probs = vec![1.0 / 38.0; 38];
        assert!(!guard.check(&probs).accepted);
    }
}
