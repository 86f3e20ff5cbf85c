//! Candle-backed classifier loading
//!
//! Weights come from a local safetensors file or the Hugging Face Hub and
//! are mapped once into an immutable model shared by all requests.

use crate::catalog;
use crate::classifier::LeafClassifier;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Func, VarBuilder};
use candle_transformers::models::efficientnet::{EfficientNet, MBConvConfig};
use candle_transformers::models::resnet;
use leafscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Source location for model weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSource {
    /// Load from local file system
    Local { path: PathBuf },

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        filename: String,
        revision: Option<String>,
    },
}

/// Supported classifier backbones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backbone {
    EfficientnetB0,
    Resnet50,
}

impl Backbone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EfficientnetB0 => "efficientnet_b0",
            Self::Resnet50 => "resnet50",
        }
    }
}

/// Device specification (for config files)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda {
        index: Option<usize>,
    },
    Metal {
        index: Option<usize>,
    },
}

impl DeviceSpec {
    pub fn to_device(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda { index } => Device::new_cuda(index.unwrap_or(0))
                .map_err(|e| Error::config(format!("cuda device unavailable: {e}"))),
            Self::Metal { index } => Device::new_metal(index.unwrap_or(0))
                .map_err(|e| Error::config(format!("metal device unavailable: {e}"))),
        }
    }
}

/// Configuration for loading the disease classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierModelConfig {
    /// Model weights source
    pub source: ModelSource,

    /// Network architecture the weights were trained with
    #[serde(default = "default_backbone")]
    pub backbone: Backbone,

    /// Number of output classes; must match the class table
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
}

fn default_backbone() -> Backbone {
    Backbone::EfficientnetB0
}

fn default_num_classes() -> usize {
    catalog::num_classes()
}

enum Net {
    EfficientNet(EfficientNet),
    ResNet(Func<'static>),
}

/// Immutable Candle classifier shared across requests
pub struct CandleLeafClassifier {
    net: Net,
    name: String,
    num_classes: usize,
}

impl CandleLeafClassifier {
    /// Load weights and build the configured backbone.
    ///
    /// Missing or unfetchable weights are a deployment condition, not a
    /// fault: they surface as `ModelUnavailable` so the caller can retry
    /// on a later request.
    pub fn load(config: &ClassifierModelConfig, device: &Device) -> Result<Self> {
        let weights_path = resolve_weights(&config.source)?;
        info!(path = %weights_path.display(), backbone = config.backbone.as_str(), "loading classifier weights");

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, device)
                .map_err(|e| Error::inference(format!("failed to map weights: {e}")))?
        };

        let net = match config.backbone {
            Backbone::EfficientnetB0 => {
                let blocks = MBConvConfig::b0();
                let model = EfficientNet::new(vb, blocks, config.num_classes)
                    .map_err(|e| Error::inference(format!("failed to build efficientnet_b0: {e}")))?;
                Net::EfficientNet(model)
            }
            Backbone::Resnet50 => {
                let model = resnet::resnet50(config.num_classes, vb)
                    .map_err(|e| Error::inference(format!("failed to build resnet50: {e}")))?;
                Net::ResNet(model)
            }
        };

        Ok(Self {
            net,
            name: config.backbone.as_str().to_string(),
            num_classes: config.num_classes,
        })
    }
}

impl LeafClassifier for CandleLeafClassifier {
    fn infer(&self, input: &Tensor) -> Result<Vec<f32>> {
        let batched = input
            .unsqueeze(0)
            .map_err(|e| Error::inference(format!("batching failed: {e}")))?;

        let logits = match &self.net {
            Net::EfficientNet(model) => model.forward(&batched),
            Net::ResNet(model) => model.forward(&batched),
        }
        .map_err(|e| Error::inference(format!("forward pass failed: {e}")))?;

        let scores = logits
            .squeeze(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| Error::inference(format!("logit extraction failed: {e}")))?;

        if scores.len() != self.num_classes {
            return Err(Error::inference(format!(
                "expected {} scores, model produced {}",
                self.num_classes,
                scores.len()
            )));
        }

        Ok(scores)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

/// Resolve a weights source to a local file path
pub fn resolve_weights(source: &ModelSource) -> Result<PathBuf> {
    match source {
        ModelSource::Local { path } => {
            if path.exists() {
                Ok(path.clone())
            } else {
                warn!(path = %path.display(), "no weights file at configured path");
                Err(Error::ModelUnavailable)
            }
        }
        ModelSource::HuggingFace {
            repo_id,
            filename,
            revision,
        } => {
            let api = hf_hub::api::sync::Api::new()
                .map_err(|e| Error::config(format!("hf-hub init failed: {e}")))?;
            let repo = match revision {
                Some(rev) => api.repo(hf_hub::Repo::with_revision(
                    repo_id.clone(),
                    hf_hub::RepoType::Model,
                    rev.clone(),
                )),
                None => api.model(repo_id.clone()),
            };
            repo.get(filename).map_err(|e| {
                warn!(%repo_id, %filename, error = %e, "weights download failed");
                Error::ModelUnavailable
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_local_weights_report_model_unavailable() {
        let source = ModelSource::Local {
            path: PathBuf::from("/nonexistent/model.safetensors"),
        };
        let err = resolve_weights(&source).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable));
    }

    #[test]
    fn config_defaults_match_the_class_table() {
        let yaml = r#"
source:
  path: ./models/plant_disease.safetensors
"#;
        let config: ClassifierModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.backbone, Backbone::EfficientnetB0);
        assert_eq!(config.num_classes, 38);
    }

    #[test]
    fn backbone_names_round_trip() {
        let backbone: Backbone = serde_yaml::from_str("resnet50").unwrap();
        assert_eq!(backbone, Backbone::Resnet50);
        assert_eq!(backbone.as_str(), "resnet50");
    }
}
