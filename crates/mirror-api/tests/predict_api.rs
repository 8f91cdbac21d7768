//! API integration tests.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use tower::ServiceExt;

use mirror_api::{create_router, ApiConfig, AppState};
use mirror_models::{Landmark, LandmarkKind, LandmarkSet};
use mirror_vision::{
    LabelDecoder, LandmarkDetector, LinearClassifier, PosturePredictor, UploadStaging,
    VisionResult,
};

const BOUNDARY: &str = "mirror-test-boundary";

/// Detector that finds `faces` faces of `points` landmarks in every image.
struct FixedFaceDetector {
    faces: usize,
    points: usize,
}

impl LandmarkDetector for FixedFaceDetector {
    fn kind(&self) -> LandmarkKind {
        LandmarkKind::Face
    }

    fn detect(&self, _image: &DynamicImage) -> VisionResult<Vec<LandmarkSet>> {
        let face = LandmarkSet::new(
            LandmarkKind::Face,
            (0..self.points)
                .map(|i| Landmark::new(i as f32 * 0.01, 0.5, 0.0))
                .collect(),
        );
        Ok(vec![face; self.faces])
    }
}

/// Two-class linear model that always favors "slouch".
fn classifier(n_features: usize) -> Arc<LinearClassifier> {
    Arc::new(
        LinearClassifier::new(
            vec!["0".to_string(), "1".to_string()],
            vec![vec![0.0; n_features], vec![0.0; n_features]],
            vec![0.0, 2.0],
        )
        .unwrap(),
    )
}

fn router(faces: usize, points: usize, n_features: usize, config: ApiConfig) -> Router {
    let predictor = PosturePredictor::new(
        Arc::new(FixedFaceDetector { faces, points }),
        classifier(n_features),
        LabelDecoder::new(vec!["upright".to_string(), "slouch".to_string()]).unwrap(),
    );
    create_router(AppState::new(config, predictor), None)
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::new(16, 16));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"frame.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(field: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, bytes)))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_predict_returns_label_and_confidence() {
    let app = router(1, 4, 12, ApiConfig::default());

    let response = app
        .oneshot(multipart_request("file", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["prediction"], "slouch");
    assert!(body["confidence"].as_f64().unwrap() > 0.85);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_no_face_body() {
    let app = router(0, 4, 12, ApiConfig::default());

    let response = app
        .oneshot(multipart_request("file", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        r#"{"error":"No face landmarks detected."}"#
    );
}

#[tokio::test]
async fn test_no_face_with_disk_staging_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = ApiConfig {
        upload_staging: UploadStaging::disk(dir.path()),
        ..ApiConfig::default()
    };
    let app = router(0, 4, 12, config);

    let response = app
        .oneshot(multipart_request("file", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(
        body_string(response).await,
        r#"{"error":"No face landmarks detected."}"#
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_invalid_feature_size_body() {
    // 4 landmarks -> 12 features, model trained on 1404
    let app = router(1, 4, 1404, ApiConfig::default());

    let response = app
        .oneshot(multipart_request("file", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        r#"{"error":"Invalid feature size."}"#
    );
}

#[tokio::test]
async fn test_undecodable_upload_is_error_body() {
    let app = router(1, 4, 12, ApiConfig::default());

    let response = app
        .oneshot(multipart_request("file", b"definitely not an image"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = router(1, 4, 12, ApiConfig::default());

    let response = app
        .oneshot(multipart_request("image", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["detail"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_oversized_body_is_413_detail() {
    let config = ApiConfig {
        max_body_size: 64,
        ..ApiConfig::default()
    };
    let app = router(1, 4, 12, config);

    // No Content-Length, so the limit trips while the multipart body streams.
    let response = app
        .oneshot(multipart_request("file", &png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_declared_oversized_body_is_413_detail() {
    let config = ApiConfig {
        max_body_size: 64,
        ..ApiConfig::default()
    };
    let app = router(1, 4, 12, config);

    let body = multipart_body("file", &png_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("Content-Length", body.len())
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["detail"], "Request body too large");
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = router(1, 4, 12, ApiConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers.contains_key("X-Content-Type-Options"));
    assert!(headers.contains_key("X-Frame-Options"));
    assert_eq!(headers.get("X-Request-ID").unwrap(), "req-123");
}

#[tokio::test]
async fn test_ready_reports_models() {
    let app = router(1, 4, 12, ApiConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["models"]["n_features"], 12);
    assert_eq!(body["models"]["classes"][1], "slouch");
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = router(1, 4, 12, ApiConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/predict")
                .header("Origin", "http://localhost:3000")
                .header("Access-Control-Request-Method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_rate_limiting() {
    let config = ApiConfig {
        rate_limit_rps: 1,
        rate_limit_burst: 1,
        ..ApiConfig::default()
    };
    let app = router(1, 4, 12, config);

    let send = |app: Router| async move {
        let mut request = multipart_request("file", &png_bytes());
        request
            .headers_mut()
            .insert("X-Forwarded-For", "192.168.1.100".parse().unwrap());
        app.oneshot(request).await.unwrap()
    };

    assert_eq!(send(app.clone()).await.status(), StatusCode::OK);
    let limited = send(app).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("Retry-After"));
}
