//! Error types for Leafscan

/// Result type alias using Leafscan's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Leafscan operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upload was declared with a non-image content type
    #[error("Uploaded file must be an image.")]
    NotAnImage,

    /// Upload contained no bytes
    #[error("Uploaded file is empty. Please upload a valid image.")]
    EmptyPayload,

    /// Upload exceeded the configured size limit
    #[error("File too large. Maximum size is {limit_mb} MB.")]
    PayloadTooLarge { limit_mb: u64 },

    /// Payload could not be parsed as any known image container
    #[error("Invalid image file. Please upload a valid image.")]
    CorruptImage,

    /// Image parsed but its format is not in the allow-list
    #[error("Unsupported format: {detected}. Allowed: {allowed}")]
    UnsupportedFormat { detected: String, allowed: String },

    /// No classifier weights are available yet
    #[error(
        "Model not loaded. Please train a model first or place a trained \
         model file at the configured model path."
    )]
    ModelUnavailable,

    /// A validity guard rejected the input; not a fault, a negative outcome
    #[error("{0}")]
    GuardRejected(String),

    /// Preprocessing failure on an already-validated payload
    #[error("preprocessing error: {0}")]
    Preprocess(String),

    /// Classifier or zero-shot capability failure
    #[error("inference error: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new preprocessing error
    pub fn preprocess(msg: impl Into<String>) -> Self {
        Self::Preprocess(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a guard rejection carrying the user-facing message
    pub fn guard_rejected(msg: impl Into<String>) -> Self {
        Self::GuardRejected(msg.into())
    }

    /// True for errors caused by the uploaded payload itself
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotAnImage
                | Self::EmptyPayload
                | Self::PayloadTooLarge { .. }
                | Self::CorruptImage
                | Self::UnsupportedFormat { .. }
        )
    }

    /// Message safe to return to the caller. Internal faults are collapsed
    /// to a generic string so capability details never leak.
    pub fn public_message(&self) -> String {
        match self {
            Self::Preprocess(_) | Self::Inference(_) | Self::Io(_) | Self::Serialization(_) => {
                "Internal error while processing the image. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_flagged() {
        assert!(Error::EmptyPayload.is_validation());
        assert!(Error::PayloadTooLarge { limit_mb: 10 }.is_validation());
        assert!(!Error::ModelUnavailable.is_validation());
        assert!(!Error::guard_rejected("nope").is_validation());
    }

    #[test]
    fn internal_faults_do_not_leak() {
        let err = Error::inference("tensor shape mismatch at layer 4");
        assert!(!err.public_message().contains("layer 4"));

        let err = Error::PayloadTooLarge { limit_mb: 10 };
        assert_eq!(err.public_message(), "File too large. Maximum size is 10 MB.");
    }
}
