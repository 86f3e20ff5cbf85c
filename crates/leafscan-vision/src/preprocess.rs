//! Deterministic image-to-tensor preprocessing
//!
//! Same bytes always yield the same tensor: RGB decode, exact resize to a
//! square, scale to [0, 1], per-channel ImageNet normalization, CHW layout.

use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use leafscan_core::{Error, Result};

/// Per-channel normalization constants shared by both backbones
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Default edge length of the model input square
pub const DEFAULT_IMAGE_SIZE: usize = 224;

#[derive(Clone)]
pub struct Preprocessor {
    size: usize,
    device: Device,
}

impl Preprocessor {
    pub fn new(size: usize, device: Device) -> Self {
        Self { size, device }
    }

    /// Edge length of the produced tensor
    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform validated image bytes into a (3, S, S) f32 tensor.
    ///
    /// Failures here are internal faults: the validator already guaranteed
    /// the container parses.
    pub fn preprocess(&self, bytes: &[u8]) -> Result<Tensor> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::preprocess(format!("decode failed after validation: {e}")))?
            .to_rgb8();

        let resized = image::imageops::resize(
            &img,
            self.size as u32,
            self.size as u32,
            FilterType::Triangle,
        );

        let pixels = self.size * self.size;
        let mut data = vec![0f32; 3 * pixels];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                data[c * pixels + i] =
                    (pixel.0[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }

        Tensor::from_vec(data, (3, self.size, self.size), &self.device)
            .map_err(|e| Error::preprocess(format!("tensor construction failed: {e}")))
    }
}
