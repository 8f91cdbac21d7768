//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mirror_vision::{UploadStaging, POSTURE_CONFIDENCE_THRESHOLD};

/// Model files loaded at startup.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// ONNX face box detector that locates the face before landmarking
    pub face_detector: PathBuf,
    /// ONNX face landmark model
    pub face_landmarker: PathBuf,
    /// Posture classifier (`.onnx` with manifest, or linear `.json`)
    pub posture_classifier: PathBuf,
    /// Label decoder classes
    pub label_encoder: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("models/mirror_posture/face_detector.onnx"),
            face_landmarker: PathBuf::from("models/mirror_posture/face_landmark.onnx"),
            posture_classifier: PathBuf::from("models/mirror_posture/posture_classifier.onnx"),
            label_encoder: PathBuf::from("models/mirror_posture/label_encoder.json"),
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Rate limit burst
    pub rate_limit_burst: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// How uploads are decoded
    pub upload_staging: UploadStaging,
    pub models: ModelPaths,
    /// Minimum posture probability for a label to be reported
    pub confidence_threshold: f32,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            rate_limit_burst: 20,
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10MB
            upload_staging: UploadStaging::Memory,
            models: ModelPaths::default(),
            confidence_threshold: POSTURE_CONFIDENCE_THRESHOLD,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT", defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| parse_origins(&s))
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS", defaults.rate_limit_rps),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT", 30)),
            max_body_size: env_parse("MAX_BODY_SIZE", defaults.max_body_size),
            upload_staging: parse_staging(
                std::env::var("UPLOAD_STAGING").ok().as_deref(),
                std::env::var("UPLOAD_STAGING_DIR").ok().as_deref(),
            ),
            models: ModelPaths {
                face_detector: env_path("FACE_DETECTOR_MODEL", defaults.models.face_detector),
                face_landmarker: env_path("FACE_LANDMARKER_MODEL", defaults.models.face_landmarker),
                posture_classifier: env_path(
                    "POSTURE_CLASSIFIER_MODEL",
                    defaults.models.posture_classifier,
                ),
                label_encoder: env_path("POSTURE_LABEL_ENCODER", defaults.models.label_encoder),
            },
            confidence_threshold: parse_threshold(
                std::env::var("POSTURE_CONFIDENCE_THRESHOLD").ok().as_deref(),
            ),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var_os(key).map(PathBuf::from).unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A probability in `[0, 1]`; anything else keeps the default.
fn parse_threshold(raw: Option<&str>) -> f32 {
    match raw.map(|s| s.trim().parse::<f32>()) {
        Some(Ok(value)) if (0.0..=1.0).contains(&value) => value,
        Some(_) => {
            tracing::warn!(
                value = raw.unwrap_or_default(),
                default = POSTURE_CONFIDENCE_THRESHOLD,
                "Ignoring POSTURE_CONFIDENCE_THRESHOLD outside [0, 1]"
            );
            POSTURE_CONFIDENCE_THRESHOLD
        }
        None => POSTURE_CONFIDENCE_THRESHOLD,
    }
}

/// `disk` stages into `dir` (default: working directory); anything else
/// decodes in memory.
fn parse_staging(mode: Option<&str>, dir: Option<&str>) -> UploadStaging {
    match mode.map(|m| m.trim().to_lowercase()).as_deref() {
        Some("disk") => UploadStaging::disk(dir.unwrap_or(".")),
        _ => UploadStaging::Memory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.upload_staging, UploadStaging::Memory);
        assert_eq!(config.confidence_threshold, 0.5);
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold(None), POSTURE_CONFIDENCE_THRESHOLD);
        assert_eq!(parse_threshold(Some(" 0.7 ")), 0.7);
        assert_eq!(parse_threshold(Some("0")), 0.0);
        assert_eq!(parse_threshold(Some("1")), 1.0);
        assert_eq!(parse_threshold(Some("NaN")), POSTURE_CONFIDENCE_THRESHOLD);
        assert_eq!(parse_threshold(Some("inf")), POSTURE_CONFIDENCE_THRESHOLD);
        assert_eq!(parse_threshold(Some("1.5")), POSTURE_CONFIDENCE_THRESHOLD);
        assert_eq!(parse_threshold(Some("-0.1")), POSTURE_CONFIDENCE_THRESHOLD);
        assert_eq!(parse_threshold(Some("high")), POSTURE_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn test_parse_staging() {
        assert_eq!(parse_staging(None, None), UploadStaging::Memory);
        assert_eq!(parse_staging(Some("memory"), Some("/tmp")), UploadStaging::Memory);
        assert_eq!(parse_staging(Some("DISK"), None), UploadStaging::disk("."));
        assert_eq!(
            parse_staging(Some("disk"), Some("/var/uploads")),
            UploadStaging::disk("/var/uploads")
        );
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:3000, https://mirror.app,"),
            vec!["http://localhost:3000", "https://mirror.app"]
        );
    }
}
