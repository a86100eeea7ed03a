//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /process`: validate a clip request and run the pipeline on it
//! - `GET /health` liveness probe
//! - Request ids, request logging and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
