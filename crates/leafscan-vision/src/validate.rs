//! Structural image validation
//!
//! Rejects bad payloads before any numeric work, cheapest check first:
//! declared MIME type, emptiness, size limit, container parse, format
//! allow-list. Only header bytes are read; no pixel decode happens here.

use image::ImageReader;
use leafscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Cursor;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Validation limits and format allow-list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageValidatorConfig {
    /// Maximum accepted payload size in bytes
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,

    /// Lowercase file extensions of accepted formats
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: BTreeSet<String>,
}

impl Default for ImageValidatorConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            allowed_formats: default_allowed_formats(),
        }
    }
}

fn default_max_payload_bytes() -> u64 {
    10 * BYTES_PER_MB
}

fn default_allowed_formats() -> BTreeSet<String> {
    ["jpg", "jpeg", "png", "webp", "bmp"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Structural gatekeeper for uploaded images
#[derive(Debug, Clone, Default)]
pub struct ImageValidator {
    config: ImageValidatorConfig,
}

impl ImageValidator {
    pub fn new(config: ImageValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a payload against the declared MIME type and the
    /// configured limits. Fail-fast: the first violated check wins.
    pub fn validate(&self, bytes: &[u8], declared_mime: Option<&str>) -> Result<()> {
        if let Some(mime) = declared_mime {
            if !mime.starts_with("image/") {
                return Err(Error::NotAnImage);
            }
        }

        if bytes.is_empty() {
            return Err(Error::EmptyPayload);
        }

        if bytes.len() as u64 > self.config.max_payload_bytes {
            return Err(Error::PayloadTooLarge {
                limit_mb: self.config.max_payload_bytes / BYTES_PER_MB,
            });
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|_| Error::CorruptImage)?;

        let format = reader.format().ok_or(Error::CorruptImage)?;

        // Header parse only; confirms the container is structurally sound
        // without decoding pixels.
        reader.into_dimensions().map_err(|_| Error::CorruptImage)?;

        let known_as = format.extensions_str();
        let allowed = known_as
            .iter()
            .any(|ext| self.config.allowed_formats.contains(*ext));

        if !allowed {
            return Err(Error::UnsupportedFormat {
                detected: known_as.first().copied().unwrap_or("unknown").to_string(),
                allowed: self
                    .config
                    .allowed_formats
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    fn encode(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([20, 140, 60])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn accepts_valid_png() {
        let validator = ImageValidator::default();
        assert!(validator.validate(&encode(ImageFormat::Png), Some("image/png")).is_ok());
    }

    #[test]
    fn mime_check_runs_before_anything_else() {
        let validator = ImageValidator::default();
        // Even an empty body reports the MIME problem first.
        let err = validator.validate(&[], Some("text/plain")).unwrap_err();
        assert!(matches!(err, Error::NotAnImage));
    }

    #[test]
    fn missing_mime_is_not_rejected() {
        let validator = ImageValidator::default();
        assert!(validator.validate(&encode(ImageFormat::Png), None).is_ok());
    }

    #[test]
    fn rejects_empty_payload() {
        let validator = ImageValidator::default();
        let err = validator.validate(&[], Some("image/png")).unwrap_err();
        assert!(matches!(err, Error::EmptyPayload));
    }

    #[test]
    fn rejects_oversized_payload_regardless_of_content() {
        let validator = ImageValidator::new(ImageValidatorConfig {
            max_payload_bytes: 16,
            ..Default::default()
        });
        let err = validator.validate(&[0u8; 17], Some("image/png")).unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { limit_mb: 0 }));
    }

    #[test]
    fn rejects_undecodable_bytes() {
        let validator = ImageValidator::default();
        let err = validator
            .validate(b"definitely not an image", Some("image/png"))
            .unwrap_err();
        assert!(matches!(err, Error::CorruptImage));
    }

    #[test]
    fn rejects_format_outside_allow_list() {
        let validator = ImageValidator::new(ImageValidatorConfig {
            allowed_formats: ["png".to_string()].into_iter().collect(),
            ..Default::default()
        });
        let err = validator
            .validate(&encode(ImageFormat::Bmp), Some("image/bmp"))
            .unwrap_err();
        match err {
            Error::UnsupportedFormat { detected, allowed } => {
                assert_eq!(detected, "bmp");
                assert_eq!(allowed, "png");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
