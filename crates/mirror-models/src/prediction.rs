use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Classifier outcome for one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Prediction {
    /// Human-readable label, or a sentinel when nothing was recognized.
    pub label: String,
    /// Maximum class probability, for classifiers that report one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Prediction {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: Some(confidence),
        }
    }
}

/// Body returned by `POST /predict`.
///
/// Either `{"prediction": "...", "confidence": 0.93}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PredictResponse {
    Prediction { prediction: String, confidence: f32 },
    Error { error: String },
}

impl PredictResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PredictResponse::Error { .. })
    }

    /// Outcome name used for metrics labels.
    pub fn outcome(&self) -> &'static str {
        match self {
            PredictResponse::Prediction { .. } => "prediction",
            PredictResponse::Error { .. } => "error",
        }
    }
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        PredictResponse::Prediction {
            prediction: prediction.label,
            confidence: prediction.confidence.unwrap_or(0.0),
        }
    }
}
