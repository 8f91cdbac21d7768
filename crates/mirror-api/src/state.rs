//! Application state.

use std::sync::Arc;

use mirror_models::LandmarkKind;
use mirror_vision::{
    load_classifier, LabelDecoder, OrtLandmarkDetector, OrtRegionProposer, PosturePredictor,
    RegionLandmarkDetector, UploadStaging, VisionResult,
};
use tracing::info;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub posture: Arc<PosturePredictor>,
    pub staging: Arc<UploadStaging>,
}

impl AppState {
    /// Build state around an already loaded predictor.
    pub fn new(config: ApiConfig, posture: PosturePredictor) -> Self {
        let staging = Arc::new(config.upload_staging.clone());
        Self {
            config,
            posture: Arc::new(posture),
            staging,
        }
    }

    /// Load the classifier, label decoder and face detector named in
    /// `config`. Fails if the decoder and classifier disagree on the number
    /// of classes.
    pub fn load(config: ApiConfig) -> VisionResult<Self> {
        let models = &config.models;
        let classifier = load_classifier(&models.posture_classifier)?;
        let labels = LabelDecoder::from_file(&models.label_encoder)?;
        labels.ensure_matches(classifier.n_classes())?;

        let faces = Arc::new(OrtRegionProposer::load(
            &models.face_detector,
            LandmarkKind::Face,
        )?);
        let mesh = Arc::new(OrtLandmarkDetector::load(
            &models.face_landmarker,
            LandmarkKind::Face,
        )?);
        let detector = Arc::new(RegionLandmarkDetector::new(faces, mesh, 1));

        info!(
            classes = labels.len(),
            n_features = classifier.n_features(),
            threshold = config.confidence_threshold,
            staging = config.upload_staging.as_str(),
            "Posture models loaded"
        );

        let posture = PosturePredictor::new(detector, classifier, labels)
            .with_threshold(config.confidence_threshold);
        Ok(Self::new(config, posture))
    }
}
