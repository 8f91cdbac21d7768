//! Landmark feature extraction and classical classification.
//!
//! This crate provides:
//! - Feature vector construction from face and hand landmarks
//! - Fixed-length padding for the two-hand gesture models
//! - Classifier backends (ONNX Runtime, JSON linear models) and label decoding
//! - Two-stage landmark detection (region proposal, square crop, landmark
//!   model) on ONNX Runtime
//! - The posture and gesture pipelines built from those pieces

pub mod classifier;
pub mod detector;
pub mod error;
pub mod features;
pub mod gesture;
pub mod labels;
pub mod posture;
#[cfg(feature = "onnx")]
mod session;
pub mod staging;

pub use classifier::{argmax, load_classifier, Classifier, LinearClassifier};
#[cfg(feature = "onnx")]
pub use classifier::{ClassifierManifest, OrtClassifier};
pub use detector::{LandmarkDetector, Region, RegionLandmarkDetector, RegionProposer};
#[cfg(feature = "onnx")]
pub use detector::{
    BoxFormat, LandmarkModelConfig, OrtLandmarkDetector, OrtRegionProposer, PixelRange,
    RegionModelConfig, TensorLayout,
};
pub use error::{VisionError, VisionResult};
pub use features::{
    check_width, face_features, gesture_features, hand_features, COORDS_PER_LANDMARK,
    HAND_FEATURE_LEN, HAND_LANDMARKS, MAX_HANDS,
};
pub use gesture::{GestureReading, GestureRecognizer};
pub use labels::LabelDecoder;
pub use posture::{PosturePredictor, NO_POSTURE_LABEL, POSTURE_CONFIDENCE_THRESHOLD};
pub use staging::{StagedUpload, UploadStaging};
