//! Gesture pipeline: hand landmarks -> padded interleaved features -> raw
//! label -> display name.

use std::sync::Arc;

use image::DynamicImage;
use mirror_models::{GestureLabels, LandmarkKind};
use serde::Serialize;
use tracing::debug;

use crate::classifier::Classifier;
use crate::detector::LandmarkDetector;
use crate::error::{VisionError, VisionResult};
use crate::features::{check_width, gesture_features};

/// A recognized gesture for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureReading {
    /// Label as produced by the classifier.
    pub raw_label: String,
    /// Display name, or the generic fallback for unmapped labels.
    pub display: String,
    /// Hands the detector found.
    pub hands: usize,
}

/// Two-hand gesture classifier.
#[derive(Clone)]
pub struct GestureRecognizer {
    detector: Arc<dyn LandmarkDetector>,
    classifier: Arc<dyn Classifier>,
    labels: Arc<GestureLabels>,
}

impl GestureRecognizer {
    pub fn new(
        detector: Arc<dyn LandmarkDetector>,
        classifier: Arc<dyn Classifier>,
        labels: GestureLabels,
    ) -> Self {
        Self {
            detector,
            classifier,
            labels: Arc::new(labels),
        }
    }

    /// Recognize the gesture in one frame.
    ///
    /// Returns `NoDetection` when no hands are visible; the classifier is
    /// only consulted when at least one hand was found.
    pub fn recognize(&self, image: &DynamicImage) -> VisionResult<GestureReading> {
        let hands = self.detector.detect(image)?;
        if hands.is_empty() {
            return Err(VisionError::NoDetection(LandmarkKind::Hand));
        }

        let features = gesture_features(&hands);
        check_width(&features, self.classifier.n_features())?;

        let raw_label = self.classifier.predict(features.as_slice())?;
        let display = self.labels.display(&raw_label).to_string();
        let display_name = display.as_str();
        debug!(raw = %raw_label, display = %display_name, hands = hands.len(), "Gesture classified");

        Ok(GestureReading {
            raw_label,
            display,
            hands: hands.len(),
        })
    }
}
