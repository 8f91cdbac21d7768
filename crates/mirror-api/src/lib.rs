//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /predict` posture classification over multipart uploads
//! - Liveness and readiness probes
//! - Per-IP rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ModelPaths};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
