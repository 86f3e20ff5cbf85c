//! Core types for Leafscan

use serde::{Deserialize, Serialize};

/// Separator between the plant and condition halves of a class name,
/// e.g. "Tomato — Late Blight".
pub const PLANT_CONDITION_SEPARATOR: &str = " — ";

/// Metadata derived from a class name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Full class name as it appears in the class table
    pub class_name: String,

    /// Plant species, the part before the separator
    pub plant: String,

    /// Disease condition, the part after the separator
    pub condition: String,

    /// Whether the condition is "healthy" (case-insensitive)
    pub is_healthy: bool,
}

impl ClassMetadata {
    /// Derive metadata from a class name by splitting on the fixed
    /// separator. A name without a separator yields an empty condition.
    pub fn from_class_name(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let (plant, condition) = match class_name.split_once(PLANT_CONDITION_SEPARATOR) {
            Some((plant, condition)) => (plant.to_string(), condition.to_string()),
            None => (class_name.clone(), String::new()),
        };
        let is_healthy = condition.eq_ignore_ascii_case("healthy");

        Self {
            class_name,
            plant,
            condition,
            is_healthy,
        }
    }
}

/// Cause, symptoms, and treatment text for one disease class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    pub cause: String,
    pub symptoms: String,
    pub treatment: String,
}

impl DiseaseRecord {
    /// Record returned for classes absent from the knowledge base, so the
    /// lookup is total and no field is ever missing.
    pub fn placeholder() -> Self {
        Self {
            cause: "Unknown".to_string(),
            symptoms: "No information available.".to_string(),
            treatment: "No information available.".to_string(),
        }
    }
}

/// One ranked class with its confidence and knowledge-base record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub class_name: String,
    pub plant: String,
    pub condition: String,

    /// Probability scaled to 0-100, rounded to two decimals
    pub confidence: f64,

    pub is_healthy: bool,
    pub info: DiseaseRecord,
}

impl RankedPrediction {
    /// Assemble a ranked prediction from class metadata, a raw probability,
    /// and the (total) knowledge-base lookup result.
    pub fn new(meta: ClassMetadata, probability: f32, info: DiseaseRecord) -> Self {
        Self {
            class_name: meta.class_name,
            plant: meta.plant,
            condition: meta.condition,
            confidence: round2(probability as f64 * 100.0),
            is_healthy: meta.is_healthy,
            info,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Final outcome of one prediction request. Exactly one of the two shapes
/// is ever serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Success {
        success: bool,
        prediction: RankedPrediction,
        alternatives: Vec<RankedPrediction>,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl PredictionResult {
    /// Build the success shape from a non-empty ranking
    pub fn success(prediction: RankedPrediction, alternatives: Vec<RankedPrediction>) -> Self {
        Self::Success {
            success: true,
            prediction,
            alternatives,
        }
    }

    /// Build the failure shape from an explanatory message
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Outcome of a plant-validity guard check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardVerdict {
    /// Whether the input is accepted as a plausible plant leaf
    pub accepted: bool,

    /// Human-readable rejection reason, present only when rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GuardVerdict {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_metadata_splits_on_separator() {
        let meta = ClassMetadata::from_class_name("Tomato — Late Blight");
        assert_eq!(meta.plant, "Tomato");
        assert_eq!(meta.condition, "Late Blight");
        assert!(!meta.is_healthy);
    }

    #[test]
    fn healthy_condition_is_case_insensitive() {
        let meta = ClassMetadata::from_class_name("Tomato — Healthy");
        assert!(meta.is_healthy);

        let meta = ClassMetadata::from_class_name("Tomato — HEALTHY");
        assert!(meta.is_healthy);
    }

    #[test]
    fn class_name_without_separator_keeps_plant_only() {
        let meta = ClassMetadata::from_class_name("Background");
        assert_eq!(meta.plant, "Background");
        assert_eq!(meta.condition, "");
        assert!(!meta.is_healthy);
    }

    #[test]
    fn confidence_is_rounded_to_two_decimals() {
        let meta = ClassMetadata::from_class_name("Apple — Apple Scab");
        let ranked = RankedPrediction::new(meta, 0.123456, DiseaseRecord::placeholder());
        assert_eq!(ranked.confidence, 12.35);
    }

    #[test]
    fn result_shapes_serialize_disjointly() {
        let failure = PredictionResult::failure("bad input");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "bad input");
        assert!(json.get("prediction").is_none());

        let meta = ClassMetadata::from_class_name("Apple — Healthy");
        let top = RankedPrediction::new(meta, 0.9, DiseaseRecord::placeholder());
        let success = PredictionResult::success(top, vec![]);
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["prediction"]["plant"], "Apple");
    }
}
