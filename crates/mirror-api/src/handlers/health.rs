//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub models: ModelStatus,
}

/// Loaded posture model summary.
#[derive(Serialize)]
pub struct ModelStatus {
    pub n_features: usize,
    pub classes: Vec<String>,
    pub confidence_threshold: f32,
    pub upload_staging: &'static str,
}

/// Readiness check endpoint (readiness probe).
///
/// Models are loaded before the listener binds, so a running server is ready.
pub async fn ready(State(state): State<AppState>) -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready".to_string(),
        models: ModelStatus {
            n_features: state.posture.n_features(),
            classes: state.posture.labels().classes().to_vec(),
            confidence_threshold: state.posture.threshold(),
            upload_staging: state.staging.as_str(),
        },
    })
}
