//! CLIP zero-shot scorer backing the semantic guard
//!
//! Scores an image against the guard's text prompts in a shared embedding
//! space. Loaded at most once per process and shared read-only afterwards;
//! the scoring call runs on the blocking pool because Candle inference is
//! CPU-bound.

use crate::model::{resolve_weights, ModelSource};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use image::imageops::FilterType;
use leafscan_core::{Error, Result};
use leafscan_guard::ZeroShotScorer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::info;

/// CLIP input resolution for the ViT-B/32 checkpoint
const CLIP_IMAGE_SIZE: u32 = 224;

const CLIP_PAD_TOKEN: &str = "<|endoftext|>";

/// Weights and tokenizer locations for the zero-shot capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipGuardModelConfig {
    /// CLIP model weights (safetensors)
    #[serde(default = "default_clip_weights")]
    pub weights: ModelSource,

    /// Matching tokenizer definition
    #[serde(default = "default_clip_tokenizer")]
    pub tokenizer: ModelSource,
}

impl Default for ClipGuardModelConfig {
    fn default() -> Self {
        Self {
            weights: default_clip_weights(),
            tokenizer: default_clip_tokenizer(),
        }
    }
}

fn default_clip_weights() -> ModelSource {
    ModelSource::HuggingFace {
        repo_id: "openai/clip-vit-base-patch32".to_string(),
        filename: "model.safetensors".to_string(),
        revision: None,
    }
}

fn default_clip_tokenizer() -> ModelSource {
    ModelSource::HuggingFace {
        repo_id: "openai/clip-vit-base-patch32".to_string(),
        filename: "tokenizer.json".to_string(),
        revision: None,
    }
}

struct ClipInner {
    model: ClipModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Zero-shot image/text scorer built on CLIP ViT-B/32
pub struct ClipZeroShot {
    inner: Arc<ClipInner>,
}

impl ClipZeroShot {
    pub fn load(config: &ClipGuardModelConfig, device: &Device) -> Result<Self> {
        let weights_path = resolve_weights(&config.weights)?;
        let tokenizer_path = resolve_weights(&config.tokenizer)?;
        info!(path = %weights_path.display(), "loading CLIP guard weights");

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, device)
                .map_err(|e| Error::inference(format!("failed to map CLIP weights: {e}")))?
        };

        let clip_config = ClipConfig::vit_base_patch32();
        let model = ClipModel::new(vb, &clip_config)
            .map_err(|e| Error::inference(format!("failed to build CLIP model: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::config(format!("failed to load CLIP tokenizer: {e}")))?;

        Ok(Self {
            inner: Arc::new(ClipInner {
                model,
                tokenizer,
                device: device.clone(),
            }),
        })
    }
}

impl ClipInner {
    fn score(&self, image: &[u8], prompts: &[String]) -> Result<Vec<f32>> {
        let pixel_values = self.image_tensor(image)?;
        let input_ids = self.tokenize(prompts)?;

        let (_logits_per_text, logits_per_image) = self
            .model
            .forward(&pixel_values, &input_ids)
            .map_err(|e| Error::inference(format!("CLIP forward pass failed: {e}")))?;

        logits_per_image
            .squeeze(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| Error::inference(format!("CLIP logit extraction failed: {e}")))
    }

    /// Decode and scale to CLIP's expected [-1, 1] pixel range, NCHW
    fn image_tensor(&self, bytes: &[u8]) -> Result<Tensor> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::preprocess(format!("decode failed after validation: {e}")))?
            .resize_exact(CLIP_IMAGE_SIZE, CLIP_IMAGE_SIZE, FilterType::Triangle)
            .to_rgb8();

        let raw = img.into_raw();
        Tensor::from_vec(
            raw,
            (CLIP_IMAGE_SIZE as usize, CLIP_IMAGE_SIZE as usize, 3),
            &self.device,
        )
        .and_then(|t| t.permute((2, 0, 1)))
        .and_then(|t| t.to_dtype(DType::F32))
        .and_then(|t| t.affine(2.0 / 255.0, -1.0))
        .and_then(|t| t.unsqueeze(0))
        .map_err(|e| Error::preprocess(format!("CLIP tensor construction failed: {e}")))
    }

    /// Encode prompts and pad them to a common length
    fn tokenize(&self, prompts: &[String]) -> Result<Tensor> {
        let pad_id = *self
            .tokenizer
            .get_vocab(true)
            .get(CLIP_PAD_TOKEN)
            .ok_or_else(|| Error::config("CLIP tokenizer is missing the pad token".to_string()))?;

        let mut token_rows: Vec<Vec<u32>> = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let encoding = self
                .tokenizer
                .encode(prompt.as_str(), true)
                .map_err(|e| Error::inference(format!("prompt tokenization failed: {e}")))?;
            token_rows.push(encoding.get_ids().to_vec());
        }

        let max_len = token_rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in token_rows.iter_mut() {
            row.resize(max_len, pad_id);
        }

        Tensor::new(token_rows, &self.device)
            .map_err(|e| Error::inference(format!("prompt tensor construction failed: {e}")))
    }
}

#[async_trait]
impl ZeroShotScorer for ClipZeroShot {
    async fn similarity_scores(&self, image: &[u8], prompts: &[&str]) -> Result<Vec<f32>> {
        let inner = Arc::clone(&self.inner);
        let image = image.to_vec();
        let prompts: Vec<String> = prompts.iter().map(|p| p.to_string()).collect();

        tokio::task::spawn_blocking(move || inner.score(&image, &prompts))
            .await
            .map_err(|e| Error::inference(format!("CLIP scoring task failed: {e}")))?
    }

    fn name(&self) -> &str {
        "clip-vit-base-patch32"
    }
}
