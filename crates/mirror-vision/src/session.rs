//! Shared ONNX Runtime session setup.

use std::path::Path;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use tracing::info;

use crate::error::{VisionError, VisionResult};

/// Create an ONNX Runtime session from a model file.
///
/// Picks CoreML on macOS when available and falls back to CPU.
pub(crate) fn create_session(model_path: &Path) -> VisionResult<Session> {
    if !model_path.exists() {
        return Err(VisionError::ModelNotFound(model_path.to_path_buf()));
    }

    let model_bytes = std::fs::read(model_path)?;

    let builder = Session::builder()
        .map_err(|e| VisionError::invalid_model(format!("ORT session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::invalid_model(format!("ORT opt level: {e}")))?;

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!(path = %model_path.display(), "Using CoreML execution provider");
                return Ok(session);
            }
        }
    }

    info!(path = %model_path.display(), "Using CPU execution provider");
    builder
        .commit_from_memory(model_bytes.as_slice())
        .map_err(|e| VisionError::invalid_model(format!("ORT load model: {e}")))
}
