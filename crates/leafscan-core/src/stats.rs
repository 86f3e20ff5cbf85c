//! Probability math shared by the ranker and the statistical guard

/// Numerically stable softmax: subtracts the max score before
/// exponentiating so large logits cannot overflow.
///
/// Returns an empty vector for empty input.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Shannon entropy of a distribution, normalized to [0, 1] by dividing by
/// the maximum entropy for its support size (ln of the count of strictly
/// positive entries).
///
/// Distributions with fewer than two strictly positive entries have zero
/// spread by definition, so their normalized entropy is 0. This pins the
/// degenerate case instead of dividing by ln(1).
pub fn normalized_entropy(probs: &[f32]) -> f64 {
    let positive: Vec<f64> = probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p as f64)
        .collect();

    if positive.len() < 2 {
        return 0.0;
    }

    let entropy: f64 = -positive.iter().map(|p| p * p.ln()).sum::<f64>();
    entropy / (positive.len() as f64).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, 4.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 999.0, 998.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn softmax_of_uniform_logits_is_uniform() {
        let probs = softmax(&[0.5; 8]);
        for &p in &probs {
            assert!((p - 0.125).abs() < 1e-6);
        }
    }

    #[test]
    fn entropy_of_one_hot_is_zero() {
        let mut probs = vec![0.0f32; 38];
        probs[7] = 1.0;
        assert_eq!(normalized_entropy(&probs), 0.0);
    }

    #[test]
    fn entropy_of_uniform_is_one() {
        let probs = vec![1.0 / 38.0; 38];
        assert!((normalized_entropy(&probs) - 1.0).abs() < EPS);
    }

    #[test]
    fn entropy_is_bounded_for_mixed_distributions() {
        let probs = [0.7, 0.2, 0.05, 0.05];
        let h = normalized_entropy(&probs);
        assert!(h > 0.0 && h < 1.0);
    }

    #[test]
    fn entropy_of_empty_and_all_zero_is_zero() {
        assert_eq!(normalized_entropy(&[]), 0.0);
        assert_eq!(normalized_entropy(&[0.0, 0.0, 0.0]), 0.0);
    }
}
