//! Shared application state

use crate::config::{GuardStrategy, ServerConfig};
use leafscan_guard::{PlantGuard, SemanticGuard, StatisticalGuard};
use leafscan_vision::{
    CandleLeafClassifier, ClassifierLoader, ClipZeroShot, ImageValidator, PredictionEngine,
    Preprocessor, SharedClassifier, TopKRanker,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PredictionEngine>,
    pub metrics: PrometheusHandle,
    pub backbone: Arc<str>,
    pub max_body_bytes: usize,
}

impl AppState {
    /// Build the prediction engine and its capabilities from config.
    ///
    /// The disease classifier itself stays unloaded until the first
    /// prediction; only the semantic guard's CLIP weights load here,
    /// because a deployment that chose that strategy cannot serve
    /// anything without them.
    pub fn from_config(config: &ServerConfig, metrics: PrometheusHandle) -> anyhow::Result<Self> {
        let device = config.device.to_device()?;

        let guard = match config.guard.strategy {
            GuardStrategy::Disabled => PlantGuard::Disabled,
            GuardStrategy::Statistical => {
                PlantGuard::Statistical(StatisticalGuard::new(config.guard.statistical))
            }
            GuardStrategy::Semantic => {
                info!("loading CLIP weights for the semantic guard");
                let scorer = ClipZeroShot::load(&config.guard.clip, &device)?;
                PlantGuard::Semantic(SemanticGuard::new(Box::new(scorer), config.guard.semantic))
            }
        };

        let model_config = config.model.clone();
        let loader_device = device.clone();
        let loader: ClassifierLoader = Arc::new(move || {
            let classifier = CandleLeafClassifier::load(&model_config, &loader_device)?;
            Ok(Arc::new(classifier) as SharedClassifier)
        });

        let engine = PredictionEngine::with_concurrency(
            ImageValidator::new(config.validator.clone()),
            Preprocessor::new(config.image_size, device),
            TopKRanker::new(config.top_k),
            guard,
            loader,
            config.max_concurrency.unwrap_or_else(num_cpus::get),
        );

        Ok(Self {
            engine: Arc::new(engine),
            metrics,
            backbone: Arc::from(config.model.backbone.as_str()),
            max_body_bytes: config.validator.max_payload_bytes as usize,
        })
    }
}
