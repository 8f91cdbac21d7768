//! Classical classifier backends.
//!
//! Models are trained offline and exported either to ONNX (with a JSON
//! manifest next to the model) or to a plain JSON linear model. Both are
//! loaded once at startup and shared read-only between calls.

mod linear;
#[cfg(feature = "onnx")]
mod onnx;

use std::path::Path;
use std::sync::Arc;

pub use linear::LinearClassifier;
#[cfg(feature = "onnx")]
pub use onnx::{ClassifierManifest, OrtClassifier};

use crate::error::{VisionError, VisionResult};

/// A trained classifier over fixed-width feature rows.
#[cfg_attr(test, mockall::automock)]
pub trait Classifier: Send + Sync {
    /// Feature width the model was trained on.
    fn n_features(&self) -> usize;

    /// Number of classes in the probability output.
    fn n_classes(&self) -> usize;

    /// Raw label of the most likely class.
    fn predict(&self, features: &[f32]) -> VisionResult<String>;

    /// Per-class probabilities, indexed by encoded class.
    fn predict_proba(&self, features: &[f32]) -> VisionResult<Vec<f32>>;
}

/// Index and value of the largest entry. Ties resolve to the first index.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some((_, top)) if value <= top => {}
            _ if value.is_nan() => {}
            _ => best = Some((index, value)),
        }
    }
    best
}

/// Label of the highest-scoring class.
pub(crate) fn label_for_scores(classes: &[String], scores: &[f32]) -> VisionResult<String> {
    let (index, _) =
        argmax(scores).ok_or_else(|| VisionError::inference("classifier produced no scores"))?;
    classes
        .get(index)
        .cloned()
        .ok_or(VisionError::UnknownClass {
            index,
            classes: classes.len(),
        })
}

/// Reject rows that do not match the trained width before touching the model.
pub(crate) fn ensure_row_width(features: &[f32], expected: usize) -> VisionResult<()> {
    if features.len() != expected {
        return Err(VisionError::InvalidFeatureSize {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Load a classifier, picking the backend from the file extension.
///
/// - `.onnx`: ONNX Runtime session plus `<model>.json` manifest
/// - `.json`: linear model evaluated in-process
pub fn load_classifier(path: impl AsRef<Path>) -> VisionResult<Arc<dyn Classifier>> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        #[cfg(feature = "onnx")]
        Some("onnx") => Ok(Arc::new(OrtClassifier::load(path)?)),
        Some("json") => Ok(Arc::new(LinearClassifier::from_file(path)?)),
        _ => Err(VisionError::invalid_model(format!(
            "unsupported classifier format: {}",
            path.display()
        ))),
    }
}
