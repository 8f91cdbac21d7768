//! Linear classifier evaluated in-process.
//!
//! Holds the `coef_`/`intercept_` of a linear model (logistic regression,
//! linear SVM) exported to JSON. Binary models with a single coefficient row
//! are expanded to two classes the way scikit-learn scores them.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;
use tracing::info;

use super::{ensure_row_width, label_for_scores, Classifier};
use crate::error::{VisionError, VisionResult};

#[derive(Debug, Deserialize)]
struct LinearModelFile {
    n_features: usize,
    classes: Vec<String>,
    coefficients: Vec<Vec<f32>>,
    intercepts: Vec<f32>,
}

/// Linear model: `scores = W x + b`, softmax for probabilities.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    classes: Vec<String>,
    weights: Array2<f32>,
    bias: Array1<f32>,
    binary: bool,
}

impl LinearClassifier {
    /// Build from class labels, one coefficient row per class, and intercepts.
    pub fn new(
        classes: Vec<String>,
        coefficients: Vec<Vec<f32>>,
        intercepts: Vec<f32>,
    ) -> VisionResult<Self> {
        let rows = coefficients.len();
        let n_features = coefficients.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || n_features == 0 {
            return Err(VisionError::invalid_model("linear model has no coefficients"));
        }
        if coefficients.iter().any(|row| row.len() != n_features) {
            return Err(VisionError::invalid_model("ragged coefficient rows"));
        }
        if intercepts.len() != rows {
            return Err(VisionError::invalid_model(format!(
                "{} intercepts for {} coefficient rows",
                intercepts.len(),
                rows
            )));
        }

        let binary = rows == 1 && classes.len() == 2;
        if !binary && rows != classes.len() {
            return Err(VisionError::invalid_model(format!(
                "{} coefficient rows for {} classes",
                rows,
                classes.len()
            )));
        }

        let flat: Vec<f32> = coefficients.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((rows, n_features), flat)
            .map_err(|e| VisionError::invalid_model(format!("coefficient shape: {e}")))?;

        Ok(Self {
            classes,
            weights,
            bias: Array1::from(intercepts),
            binary,
        })
    }

    pub fn from_json(json: &str) -> VisionResult<Self> {
        let file: LinearModelFile = serde_json::from_str(json)?;
        let model = Self::new(file.classes, file.coefficients, file.intercepts)?;
        if model.n_features() != file.n_features {
            return Err(VisionError::invalid_model(format!(
                "declared n_features {} but coefficients have {}",
                file.n_features,
                model.n_features()
            )));
        }
        Ok(model)
    }

    pub fn from_file(path: impl AsRef<Path>) -> VisionResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VisionError::ModelNotFound(path.to_path_buf()));
        }
        let model = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            classes = model.classes.len(),
            n_features = model.n_features(),
            "Loaded linear classifier"
        );
        Ok(model)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Raw decision scores, one per class.
    pub fn decision_function(&self, features: &[f32]) -> VisionResult<Vec<f32>> {
        ensure_row_width(features, self.n_features())?;
        let scores = self.weights.dot(&ArrayView1::from(features)) + &self.bias;
        if self.binary {
            // Single row scores the positive class against an implicit zero.
            return Ok(vec![0.0, scores[0]]);
        }
        Ok(scores.to_vec())
    }
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl Classifier for LinearClassifier {
    fn n_features(&self) -> usize {
        self.weights.ncols()
    }

    fn n_classes(&self) -> usize {
        self.classes.len()
    }

    fn predict(&self, features: &[f32]) -> VisionResult<String> {
        let scores = self.decision_function(features)?;
        label_for_scores(&self.classes, &scores)
    }

    fn predict_proba(&self, features: &[f32]) -> VisionResult<Vec<f32>> {
        Ok(softmax(&self.decision_function(features)?))
    }
}
