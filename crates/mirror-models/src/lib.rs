//! Shared data models for the Mirror landmark classifiers.
//!
//! This crate provides Serde-serializable types for:
//! - Detector output (landmarks and landmark sets)
//! - Classifier input (feature vectors)
//! - Prediction results and the `/predict` response body
//! - Gesture display names

pub mod feature;
pub mod gesture;
pub mod landmark;
pub mod prediction;

// Re-export common types
pub use feature::FeatureVector;
pub use gesture::{GestureLabels, GestureLabelsError, UNKNOWN_GESTURE};
pub use landmark::{Landmark, LandmarkKind, LandmarkSet};
pub use prediction::{PredictResponse, Prediction};
