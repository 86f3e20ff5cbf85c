//! Probability ranking and knowledge-base enrichment

use crate::catalog;
use leafscan_core::{softmax, ClassMetadata, Error, RankedPrediction, Result};

/// Default number of ranked classes returned per request
pub const DEFAULT_TOP_K: usize = 5;

/// Turns a raw score vector into an ordered, enriched top-K
#[derive(Debug, Clone, Copy)]
pub struct TopKRanker {
    k: usize,
}

impl Default for TopKRanker {
    fn default() -> Self {
        Self { k: DEFAULT_TOP_K }
    }
}

impl TopKRanker {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    /// Normalize raw scores into a probability distribution
    pub fn probabilities(&self, scores: &[f32]) -> Vec<f32> {
        softmax(scores)
    }

    /// Rank class indices by probability descending, ties broken by
    /// ascending index so the ordering is reproducible. Returns
    /// min(k, N) entries with non-increasing probabilities.
    pub fn rank(&self, probs: &[f32]) -> Vec<(usize, f32)> {
        let mut indices: Vec<usize> = (0..probs.len()).collect();
        indices.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]).then(a.cmp(&b)));
        indices
            .into_iter()
            .take(self.k.min(probs.len()))
            .map(|i| (i, probs[i]))
            .collect()
    }

    /// Attach class metadata and disease records to a ranking.
    ///
    /// An index outside the class table means the classifier and the
    /// table disagree about N, which is an internal fault.
    pub fn enrich(&self, ranked: &[(usize, f32)]) -> Result<Vec<RankedPrediction>> {
        ranked
            .iter()
            .map(|&(index, probability)| {
                let name = catalog::class_name(index).ok_or_else(|| {
                    Error::inference(format!(
                        "class index {index} out of range for {}-class table",
                        catalog::num_classes()
                    ))
                })?;
                let meta = ClassMetadata::from_class_name(name);
                let info = catalog::disease_record(name);
                Ok(RankedPrediction::new(meta, probability, info))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_is_non_increasing() {
        let ranker = TopKRanker::default();
        let scores: Vec<f32> = (0..38).map(|i| ((i * 7) % 11) as f32 * 0.3).collect();
        let probs = ranker.probabilities(&scores);
        let ranked = ranker.rank(&probs);

        assert_eq!(ranked.len(), 5);
        for pair in ranked.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn ties_break_by_ascending_index() {
        let ranker = TopKRanker::new(4);
        // Indices 1, 3, 5 share the top probability.
        let probs = vec![0.05, 0.25, 0.05, 0.25, 0.15, 0.25];
        let ranked = ranker.rank(&probs);
        let order: Vec<usize> = ranked.iter().map(|&(i, _)| i).collect();
        assert_eq!(order, vec![1, 3, 5, 4]);
    }

    #[test]
    fn k_larger_than_n_returns_all_classes() {
        let ranker = TopKRanker::new(100);
        let probs = vec![0.5, 0.3, 0.2];
        assert_eq!(ranker.rank(&probs).len(), 3);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let ranker = TopKRanker::default();
        let probs = ranker.probabilities(&vec![1.5f32; 38]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn enrichment_attaches_metadata_and_records() {
        let ranker = TopKRanker::default();
        // Index 30 is "Tomato — Late Blight" in the class table.
        let enriched = ranker.enrich(&[(30, 0.875f32)]).unwrap();
        assert_eq!(enriched.len(), 1);

        let top = &enriched[0];
        assert_eq!(top.class_name, "Tomato — Late Blight");
        assert_eq!(top.plant, "Tomato");
        assert_eq!(top.condition, "Late Blight");
        assert_eq!(top.confidence, 87.5);
        assert!(!top.is_healthy);
        assert!(top.info.cause.contains("Phytophthora infestans"));
    }

    #[test]
    fn out_of_range_index_is_an_internal_fault() {
        let ranker = TopKRanker::default();
        let err = ranker.enrich(&[(500, 0.5f32)]).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }
}
