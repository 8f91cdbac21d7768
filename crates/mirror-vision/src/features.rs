//! Feature vector construction from landmark sets.
//!
//! Two layouts are used by the trained models:
//! - Face: axis-grouped, `[x0..xN, y0..yN, z0..zN]`
//! - Hands: interleaved per landmark, hand by hand, zero-padded to
//!   [`HAND_FEATURE_LEN`]

use mirror_models::{FeatureVector, LandmarkSet};

use crate::error::{VisionError, VisionResult};

/// Coordinates emitted per landmark.
pub const COORDS_PER_LANDMARK: usize = 3;

/// Landmarks per detected hand.
pub const HAND_LANDMARKS: usize = 21;

/// Hands the gesture models were trained with.
pub const MAX_HANDS: usize = 2;

/// Fixed gesture model width: 2 hands x 21 landmarks x 3 coordinates.
pub const HAND_FEATURE_LEN: usize = MAX_HANDS * HAND_LANDMARKS * COORDS_PER_LANDMARK;

/// Flatten one face into all x, then all y, then all z.
pub fn face_features(face: &LandmarkSet) -> FeatureVector {
    let mut features = FeatureVector::with_capacity(face.len() * COORDS_PER_LANDMARK);
    features.extend(face.iter().map(|lm| lm.x));
    features.extend(face.iter().map(|lm| lm.y));
    features.extend(face.iter().map(|lm| lm.z));
    features
}

/// Flatten hands as `(x, y, z)` per landmark in detector order.
pub fn hand_features(hands: &[LandmarkSet]) -> FeatureVector {
    let total: usize = hands.iter().map(LandmarkSet::len).sum();
    let mut features = FeatureVector::with_capacity(total * COORDS_PER_LANDMARK);
    for hand in hands {
        for lm in hand {
            features.extend(lm.to_array());
        }
    }
    features
}

/// Hand features padded with trailing zeros to [`HAND_FEATURE_LEN`].
pub fn gesture_features(hands: &[LandmarkSet]) -> FeatureVector {
    let mut features = hand_features(hands);
    features.pad_to(HAND_FEATURE_LEN);
    features
}

/// Reject vectors whose width differs from what the classifier was trained on.
pub fn check_width(features: &FeatureVector, expected: usize) -> VisionResult<()> {
    if features.len() != expected {
        return Err(VisionError::InvalidFeatureSize {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}
