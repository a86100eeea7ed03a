//! Structured run logging.
//!
//! Every pipeline run gets a request id and a tracing span so all log lines
//! of one `/process` call can be correlated.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Logger for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    request_id: String,
    source_kind: String,
}

impl RunLogger {
    /// Create a logger with a fresh request id.
    pub fn new(source_kind: &str) -> Self {
        Self::with_request_id(&Uuid::new_v4().to_string(), source_kind)
    }

    /// Create a logger for an existing request id (e.g. from `X-Request-ID`).
    pub fn with_request_id(request_id: &str, source_kind: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            source_kind: source_kind.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            source = %self.source_kind,
            "Run started: {}", message
        );
    }

    pub fn log_progress(&self, segment: usize, stage: &str, message: &str) {
        info!(
            request_id = %self.request_id,
            segment,
            stage,
            "Run progress: {}", message
        );
    }

    pub fn log_warning(&self, segment: usize, stage: &str, message: &str) {
        warn!(
            request_id = %self.request_id,
            segment,
            stage,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            request_id = %self.request_id,
            source = %self.source_kind,
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, published: usize, failed: usize) {
        info!(
            request_id = %self.request_id,
            source = %self.source_kind,
            published,
            failed,
            "Run completed"
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Span wrapping the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "run",
            request_id = %self.request_id,
            source = %self.source_kind
        )
    }
}
