//! Leafscan Core
//!
//! Core types, error taxonomy, and probability math shared across Leafscan
//! components.
//!
//! This crate provides:
//! - The prediction and guard result types exchanged between components
//! - Error types and result handling
//! - Stable softmax and normalized entropy used by the ranker and guards

pub mod error;
pub mod stats;
pub mod types;

pub use error::{Error, Result};
pub use stats::{normalized_entropy, softmax};
pub use types::{
    ClassMetadata, DiseaseRecord, GuardVerdict, PredictionResult, RankedPrediction,
    PLANT_CONDITION_SEPARATOR,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        ClassMetadata, DiseaseRecord, GuardVerdict, PredictionResult, RankedPrediction,
    };
}
