//! Posture prediction handler.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Extension;
use axum::Json;
use mirror_models::PredictResponse;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::middleware::RequestId;
use crate::state::AppState;

/// Multipart field holding the image.
const FILE_FIELD: &str = "file";

/// Classify the posture in an uploaded image.
///
/// Pipeline outcomes, failures included, are a 200 with
/// `{"prediction", "confidence"}` or `{"error"}`. Only a malformed request
/// yields a 4xx.
pub async fn predict(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    multipart: Multipart,
) -> ApiResult<Json<PredictResponse>> {
    let request_id = request_id
        .map(|Extension(RequestId(id))| id)
        .unwrap_or_default();

    let (filename, bytes) = read_upload(multipart).await?;
    info!(
        request_id = %request_id,
        filename = %filename,
        size = bytes.len(),
        "Received file"
    );

    let posture = state.posture.clone();
    let staging = state.staging.clone();
    let start = Instant::now();

    let result = tokio::task::spawn_blocking(move || posture.predict_upload(&bytes, &staging)).await;
    let duration = start.elapsed().as_secs_f64();

    let response = match result {
        Ok(Ok(prediction)) => {
            info!(
                request_id = %request_id,
                label = %prediction.label,
                confidence = prediction.confidence.unwrap_or_default(),
                duration_ms = duration * 1000.0,
                "Posture predicted"
            );
            metrics::record_prediction("prediction", &prediction.label, duration);
            PredictResponse::from(prediction)
        }
        Ok(Err(err)) => {
            warn!(request_id = %request_id, error = %err, kind = err.kind(), "Posture prediction failed");
            metrics::record_prediction("error", err.kind(), duration);
            PredictResponse::from(err)
        }
        Err(join_err) => {
            warn!(request_id = %request_id, error = %join_err, "Inference task failed");
            metrics::record_prediction("error", "task", duration);
            PredictResponse::error(join_err.to_string())
        }
    };

    Ok(Json(response))
}

/// Pull the `file` field out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> ApiResult<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;
        return Ok((filename, bytes));
    }
    Err(ApiError::validation(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}
