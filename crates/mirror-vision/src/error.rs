//! Error types for the landmark pipelines.

use std::path::PathBuf;

use mirror_models::{LandmarkKind, PredictResponse};
use thiserror::Error;

/// Result type for pipeline operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while detecting, extracting or classifying.
///
/// `NoDetection` and `InvalidFeatureSize` render as the exact messages
/// clients receive in the `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("No {0} landmarks detected.")]
    NoDetection(LandmarkKind),

    #[error("Invalid feature size.")]
    InvalidFeatureSize { expected: usize, actual: usize },

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Class index {index} out of range for {classes} classes")]
    UnknownClass { index: usize, classes: usize },

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl VisionError {
    /// Create an inference failure error.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Create an invalid model error.
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::InvalidModel(message.into())
    }

    /// Short stable name used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            VisionError::NoDetection(_) => "no_detection",
            VisionError::InvalidFeatureSize { .. } => "invalid_feature_size",
            VisionError::Image(_) => "image",
            VisionError::Io(_) => "io",
            VisionError::Json(_) => "json",
            VisionError::ModelNotFound(_) => "model_not_found",
            VisionError::InvalidModel(_) => "invalid_model",
            VisionError::UnknownClass { .. } => "unknown_class",
            VisionError::Inference(_) => "inference",
        }
    }
}

impl From<VisionError> for PredictResponse {
    fn from(err: VisionError) -> Self {
        PredictResponse::error(err.to_string())
    }
}
