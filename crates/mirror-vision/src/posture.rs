//! Posture pipeline: face landmarks -> axis-grouped features -> probabilities
//! -> confidence threshold -> decoded label.

use std::sync::Arc;

use image::DynamicImage;
use mirror_models::Prediction;
use tracing::debug;

use crate::classifier::{argmax, Classifier};
use crate::detector::LandmarkDetector;
use crate::error::{VisionError, VisionResult};
use crate::features::{check_width, face_features};
use crate::labels::LabelDecoder;
use crate::staging::UploadStaging;

/// Minimum probability for a posture label to be reported. Inclusive.
pub const POSTURE_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Label reported when the top probability is below the threshold.
pub const NO_POSTURE_LABEL: &str = "none";

/// Face-landmark posture classifier.
///
/// Holds shared read-only handles loaded at startup; `predict` is stateless.
#[derive(Clone)]
pub struct PosturePredictor {
    detector: Arc<dyn LandmarkDetector>,
    classifier: Arc<dyn Classifier>,
    labels: Arc<LabelDecoder>,
    threshold: f32,
}

impl PosturePredictor {
    pub fn new(
        detector: Arc<dyn LandmarkDetector>,
        classifier: Arc<dyn Classifier>,
        labels: LabelDecoder,
    ) -> Self {
        Self {
            detector,
            classifier,
            labels: Arc::new(labels),
            threshold: POSTURE_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }

    pub fn labels(&self) -> &LabelDecoder {
        &self.labels
    }

    /// Classify the posture of the first face in the image.
    pub fn predict(&self, image: &DynamicImage) -> VisionResult<Prediction> {
        let faces = self.detector.detect(image)?;
        let face = faces
            .first()
            .ok_or_else(|| VisionError::NoDetection(self.detector.kind()))?;

        let features = face_features(face);
        check_width(&features, self.classifier.n_features())?;

        let probabilities = self.classifier.predict_proba(features.as_slice())?;
        let (index, confidence) = argmax(&probabilities)
            .ok_or_else(|| VisionError::inference("classifier produced no probabilities"))?;

        let label = if confidence >= self.threshold {
            self.labels.decode(index)?.to_string()
        } else {
            debug!(confidence, threshold = self.threshold, "Below confidence threshold");
            NO_POSTURE_LABEL.to_string()
        };

        Ok(Prediction::with_confidence(label, confidence))
    }

    /// Decode uploaded bytes with the configured staging and classify.
    pub fn predict_upload(&self, bytes: &[u8], staging: &UploadStaging) -> VisionResult<Prediction> {
        let image = staging.load_image(bytes)?;
        self.predict(&image)
    }
}
