//! Classifier capability trait

use candle_core::Tensor;
use leafscan_core::Result;

/// Trait for leaf-disease classifiers.
///
/// `infer` is synchronous because Candle inference is CPU-bound; the
/// orchestrator offloads calls to the blocking pool. Implementations hold
/// only immutable state after construction and must be safe to call from
/// multiple requests concurrently.
pub trait LeafClassifier: Send + Sync {
    /// Map a (3, S, S) normalized tensor to one raw score per class
    fn infer(&self, input: &Tensor) -> Result<Vec<f32>>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Length of the score vector this classifier emits
    fn num_classes(&self) -> usize;
}
