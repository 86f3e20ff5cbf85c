//! Server configuration
//!
//! Loaded from a YAML file when one exists, otherwise defaults, with CLI
//! and environment overrides applied on top.

use leafscan_guard::{SemanticGuardConfig, StatisticalGuardConfig};
use leafscan_vision::model::{Backbone, ClassifierModelConfig, DeviceSpec, ModelSource};
use leafscan_vision::preprocess::DEFAULT_IMAGE_SIZE;
use leafscan_vision::ranker::DEFAULT_TOP_K;
use leafscan_vision::{ClipGuardModelConfig, ImageValidatorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_true")]
    pub cors_allow_any: bool,

    /// Origins allowed when `cors_allow_any` is off
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Inference device
    #[serde(default)]
    pub device: DeviceSpec,

    /// Disease classifier weights and backbone
    #[serde(default = "default_model")]
    pub model: ClassifierModelConfig,

    /// Upload validation limits
    #[serde(default)]
    pub validator: ImageValidatorConfig,

    /// Model input edge length
    #[serde(default = "default_image_size")]
    pub image_size: usize,

    /// Number of ranked classes per response
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Concurrent preprocess/inference bound; defaults to the CPU count
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Plant-validity guard settings
    #[serde(default)]
    pub guard: GuardConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            cors_allow_any: true,
            cors_origins: Vec::new(),
            device: DeviceSpec::default(),
            model: default_model(),
            validator: ImageValidatorConfig::default(),
            image_size: default_image_size(),
            top_k: default_top_k(),
            max_concurrency: None,
            guard: GuardConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        let mut config: Self = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(model_path) = &cli.model {
            config.model.source = ModelSource::Local {
                path: PathBuf::from(model_path),
            };
        }
        if let Some(strategy) = cli.guard {
            config.guard.strategy = strategy;
        }

        Ok(config)
    }
}

/// Which validity guard runs, and its thresholds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Active strategy
    #[serde(default)]
    pub strategy: GuardStrategy,

    /// Thresholds for the statistical strategy
    #[serde(default)]
    pub statistical: StatisticalGuardConfig,

    /// Threshold for the semantic strategy
    #[serde(default)]
    pub semantic: SemanticGuardConfig,

    /// CLIP weights for the semantic strategy
    #[serde(default)]
    pub clip: ClipGuardModelConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GuardStrategy {
    /// No validity screening
    Disabled,
    /// Vote over the classifier's probability distribution
    #[default]
    Statistical,
    /// Zero-shot semantic screening before classification
    Semantic,
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model() -> ClassifierModelConfig {
    ClassifierModelConfig {
        source: ModelSource::Local {
            path: PathBuf::from("./models/plant_disease.safetensors"),
        },
        backbone: Backbone::EfficientnetB0,
        num_classes: leafscan_vision::num_classes(),
    }
}

fn default_image_size() -> usize {
    DEFAULT_IMAGE_SIZE
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_uses_defaults() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.image_size, 224);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.guard.strategy, GuardStrategy::Statistical);
        assert!(config.cors_allow_any);
    }

    #[test]
    fn guard_section_overrides_thresholds() {
        let yaml = r#"
guard:
  strategy: semantic
  semantic:
    plant_probability_threshold: 0.6
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.guard.strategy, GuardStrategy::Semantic);
        assert_eq!(config.guard.semantic.plant_probability_threshold, 0.6);
        // Untouched sections keep their defaults.
        assert_eq!(config.guard.statistical.confidence_threshold, 0.5);
    }

    #[test]
    fn model_section_parses_local_and_hub_sources() {
        let yaml = r#"
model:
  source:
    repo_id: leafscan/plant-disease-efficientnet-b0
    filename: model.safetensors
    revision: null
  backbone: resnet50
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.model.source,
            ModelSource::HuggingFace { .. }
        ));
    }
}
