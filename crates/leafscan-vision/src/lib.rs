//! Image intake, Candle-backed classification, and the prediction pipeline.
//!
//! This crate owns everything between raw upload bytes and an enriched
//! ranking: structural validation, tensor preprocessing, the classifier
//! backbones, the CLIP zero-shot scorer, and the orchestrator that wires
//! the stages together with the guard hooks from `leafscan-guard`.

pub mod catalog;
pub mod classifier;
pub mod clip;
pub mod engine;
pub mod model;
pub mod preprocess;
pub mod ranker;
pub mod validate;

pub use catalog::{catalog_listing, class_name, disease_record, num_classes, CatalogListing};
pub use classifier::LeafClassifier;
pub use clip::{ClipGuardModelConfig, ClipZeroShot};
pub use engine::{ClassifierLoader, Diagnosis, PredictionEngine, SharedClassifier};
pub use model::{
    resolve_weights, Backbone, CandleLeafClassifier, ClassifierModelConfig, DeviceSpec,
    ModelSource,
};
pub use preprocess::Preprocessor;
pub use ranker::{TopKRanker, DEFAULT_TOP_K};
pub use validate::{ImageValidator, ImageValidatorConfig};

/// Commonly used types for building a prediction service
pub mod prelude {
    pub use crate::catalog;
    pub use crate::classifier::LeafClassifier;
    pub use crate::engine::{ClassifierLoader, Diagnosis, PredictionEngine, SharedClassifier};
    pub use crate::model::{Backbone, CandleLeafClassifier, ClassifierModelConfig, ModelSource};
    pub use crate::preprocess::Preprocessor;
    pub use crate::ranker::TopKRanker;
    pub use crate::validate::{ImageValidator, ImageValidatorConfig};
}
