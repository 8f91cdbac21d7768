//! ONNX Runtime classifier backend.
//!
//! Expects a model exported with a single `[1, n_features]` f32 input and a
//! per-class probability (or score) output of shape `[1, classes]`. For
//! scikit-learn exports this means disabling the ZipMap post-processor so
//! probabilities come back as a plain tensor.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::Session;
use ort::value::{DynValueTypeMarker, Tensor, Value};
use serde::Deserialize;
use tracing::{debug, info};

use super::{ensure_row_width, label_for_scores, Classifier};
use crate::error::{VisionError, VisionResult};
use crate::session::create_session;

fn default_probability_output() -> String {
    "probabilities".to_string()
}

/// Sidecar description of an exported classifier, stored as `<model>.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierManifest {
    /// Feature width the model was trained on.
    pub n_features: usize,
    /// Raw labels in class-index order.
    pub classes: Vec<String>,
    /// Name of the probability output tensor.
    #[serde(default = "default_probability_output")]
    pub probability_output: String,
}

impl ClassifierManifest {
    pub fn from_file(path: &Path) -> VisionResult<Self> {
        if !path.exists() {
            return Err(VisionError::ModelNotFound(path.to_path_buf()));
        }
        let manifest: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        if manifest.n_features == 0 || manifest.classes.is_empty() {
            return Err(VisionError::invalid_model(format!(
                "manifest {} declares no features or classes",
                path.display()
            )));
        }
        Ok(manifest)
    }

    /// Manifest path for a model file: same stem, `.json` extension.
    pub fn path_for(model_path: &Path) -> PathBuf {
        model_path.with_extension("json")
    }
}

/// ONNX Runtime session wrapped for shared read-only use.
pub struct OrtClassifier {
    session: Mutex<Session>,
    manifest: ClassifierManifest,
}

impl OrtClassifier {
    pub fn load(model_path: &Path) -> VisionResult<Self> {
        let manifest = ClassifierManifest::from_file(&ClassifierManifest::path_for(model_path))?;
        Self::load_with_manifest(model_path, manifest)
    }

    pub fn load_with_manifest(model_path: &Path, manifest: ClassifierManifest) -> VisionResult<Self> {
        let session = create_session(model_path)?;

        info!(
            path = %model_path.display(),
            classes = manifest.classes.len(),
            n_features = manifest.n_features,
            "Loaded ONNX classifier"
        );

        Ok(Self {
            session: Mutex::new(session),
            manifest,
        })
    }

    pub fn manifest(&self) -> &ClassifierManifest {
        &self.manifest
    }

    fn run(&self, features: &[f32]) -> VisionResult<Vec<f32>> {
        ensure_row_width(features, self.manifest.n_features)?;

        let shape = vec![1usize, features.len()];
        let input = Tensor::from_array((shape, features.to_vec().into_boxed_slice()))
            .map(Value::<DynValueTypeMarker>::from)
            .map_err(|e| VisionError::inference(format!("ORT tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::inference("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference(format!("ORT run failed: {e}")))?;

        let output = outputs
            .get(self.manifest.probability_output.as_str())
            .ok_or_else(|| {
                VisionError::inference(format!(
                    "missing output '{}'",
                    self.manifest.probability_output
                ))
            })?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("ORT extract: {e}")))?;

        if data.len() != self.manifest.classes.len() {
            return Err(VisionError::invalid_model(format!(
                "classifier returned {} scores for {} classes",
                data.len(),
                self.manifest.classes.len()
            )));
        }

        debug!(scores = ?data, "Classifier output");
        Ok(data.to_vec())
    }
}

impl Classifier for OrtClassifier {
    fn n_features(&self) -> usize {
        self.manifest.n_features
    }

    fn n_classes(&self) -> usize {
        self.manifest.classes.len()
    }

    fn predict(&self, features: &[f32]) -> VisionResult<String> {
        let scores = self.run(features)?;
        label_for_scores(&self.manifest.classes, &scores)
    }

    fn predict_proba(&self, features: &[f32]) -> VisionResult<Vec<f32>> {
        self.run(features)
    }
}
