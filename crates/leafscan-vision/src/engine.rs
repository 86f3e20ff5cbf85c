//! Prediction orchestrator
//!
//! Sequences one request through validation, the optional semantic guard,
//! preprocessing, inference, ranking, the optional statistical guard, and
//! enrichment. The first failing stage wins and nothing after it runs.

use crate::catalog;
use crate::classifier::LeafClassifier;
use crate::preprocess::Preprocessor;
use crate::ranker::TopKRanker;
use crate::validate::ImageValidator;
use leafscan_core::{Error, PredictionResult, RankedPrediction, Result};
use leafscan_guard::PlantGuard;
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, instrument};

/// Shared, immutable classifier handle
pub type SharedClassifier = Arc<dyn LeafClassifier>;

/// Factory invoked at most once per successful load. Runs on the blocking
/// pool; a failed load is retried on the next request.
pub type ClassifierLoader = Arc<dyn Fn() -> Result<SharedClassifier> + Send + Sync>;

/// Successful outcome of the pipeline: the top class plus K-1 alternatives
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub prediction: RankedPrediction,
    pub alternatives: Vec<RankedPrediction>,
}

impl From<Diagnosis> for PredictionResult {
    fn from(diagnosis: Diagnosis) -> Self {
        PredictionResult::success(diagnosis.prediction, diagnosis.alternatives)
    }
}

/// Request-scoped pipeline over process-scoped capabilities.
///
/// The classifier cell is single-assignment: the first request to observe
/// it empty triggers the load under the cell's own mutual exclusion, and
/// every later request reuses the same instance lock-free.
pub struct PredictionEngine {
    validator: ImageValidator,
    preprocessor: Preprocessor,
    ranker: TopKRanker,
    guard: PlantGuard,
    loader: ClassifierLoader,
    classifier: OnceCell<SharedClassifier>,
    inference_slots: Arc<Semaphore>,
}

impl PredictionEngine {
    pub fn new(
        validator: ImageValidator,
        preprocessor: Preprocessor,
        ranker: TopKRanker,
        guard: PlantGuard,
        loader: ClassifierLoader,
    ) -> Self {
        Self::with_concurrency(validator, preprocessor, ranker, guard, loader, num_cpus::get())
    }

    /// Like `new` but with an explicit bound on concurrent heavy stages
    /// (preprocess + infer). Requests beyond the bound queue on the
    /// semaphore instead of piling onto the blocking pool.
    pub fn with_concurrency(
        validator: ImageValidator,
        preprocessor: Preprocessor,
        ranker: TopKRanker,
        guard: PlantGuard,
        loader: ClassifierLoader,
        max_concurrent: usize,
    ) -> Self {
        Self {
            validator,
            preprocessor,
            ranker,
            guard,
            loader,
            classifier: OnceCell::new(),
            inference_slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Whether the classifier capability has been loaded yet
    pub fn model_loaded(&self) -> bool {
        self.classifier.initialized()
    }

    /// Active guard strategy name, for the health endpoint
    pub fn guard_strategy(&self) -> &'static str {
        self.guard.strategy_name()
    }

    /// Get or lazily load the shared classifier. A load failure is not
    /// cached: the capability may become available later.
    pub async fn classifier(&self) -> Result<SharedClassifier> {
        self.classifier
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                info!("loading classifier capability");
                tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| Error::inference(format!("classifier load task failed: {e}")))?
            })
            .await
            .cloned()
    }

    /// Run the full pipeline for one request.
    #[instrument(skip_all, fields(bytes = image.len()))]
    pub async fn predict(&self, image: &[u8], declared_mime: Option<&str>) -> Result<Diagnosis> {
        self.validator.validate(image, declared_mime)?;

        // Semantic screening happens before any tensor work so clearly
        // irrelevant images never pay for inference.
        let verdict = self.guard.pre_classification(image).await?;
        if !verdict.accepted {
            debug!("rejected by semantic guard");
            return Err(Error::guard_rejected(verdict.reason.unwrap_or_default()));
        }

        let classifier = self.classifier().await?;

        let scores = self.run_inference(classifier, image.to_vec()).await?;
        if scores.len() != catalog::num_classes() {
            return Err(Error::inference(format!(
                "classifier emitted {} scores for a {}-class table",
                scores.len(),
                catalog::num_classes()
            )));
        }

        let probs = self.ranker.probabilities(&scores);

        let verdict = self.guard.post_ranking(&probs);
        if !verdict.accepted {
            debug!("rejected by statistical guard");
            return Err(Error::guard_rejected(verdict.reason.unwrap_or_default()));
        }

        let ranked = self.ranker.rank(&probs);
        let mut enriched = self.ranker.enrich(&ranked)?;
        if enriched.is_empty() {
            return Err(Error::inference("empty ranking".to_string()));
        }

        let prediction = enriched.remove(0);
        debug!(class = %prediction.class_name, confidence = prediction.confidence, "pipeline complete");

        Ok(Diagnosis {
            prediction,
            alternatives: enriched,
        })
    }

    /// `predict` with failures folded into the wire result shape
    pub async fn predict_result(
        &self,
        image: &[u8],
        declared_mime: Option<&str>,
    ) -> PredictionResult {
        match self.predict(image, declared_mime).await {
            Ok(diagnosis) => diagnosis.into(),
            Err(err) => PredictionResult::failure(err.public_message()),
        }
    }

    /// Preprocess and infer on the blocking pool, bounded by the
    /// inference semaphore.
    async fn run_inference(
        &self,
        classifier: SharedClassifier,
        image: Vec<u8>,
    ) -> Result<Vec<f32>> {
        let _permit = self
            .inference_slots
            .acquire()
            .await
            .map_err(|e| Error::inference(format!("inference queue closed: {e}")))?;

        let preprocessor = self.preprocessor.clone();
        tokio::task::spawn_blocking(move || {
            let tensor = preprocessor.preprocess(&image)?;
            classifier.infer(&tensor)
        })
        .await
        .map_err(|e| Error::inference(format!("inference task failed: {e}")))?
    }
}
