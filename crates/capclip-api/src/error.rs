//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use capclip_models::{ModelError, SegmentFailureReport};
use capclip_pipeline::{FetchLocation, PipelineError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        Self::Pipeline(PipelineError::Validation(e))
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(e) => match e {
                PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
                PipelineError::Resolution { source, .. } if source.is_not_found() => {
                    StatusCode::NOT_FOUND
                }
                PipelineError::Resolution { source, .. } if source.is_access_denied() => {
                    StatusCode::FORBIDDEN
                }
                PipelineError::Fetch { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Pipeline(e) => e.kind(),
        }
    }
}

/// Error body: the message plus whatever locates the failure.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failures: Option<Vec<SegmentFailureReport>>,
}

impl ErrorResponse {
    fn from_error(error: &ApiError) -> Self {
        let mut body = Self {
            error: error.to_string(),
            kind: error.kind(),
            bucket: None,
            key: None,
            url: None,
            code: None,
            failures: None,
        };

        match error {
            ApiError::Pipeline(PipelineError::Resolution {
                bucket,
                key,
                source,
            }) => {
                body.bucket = Some(bucket.clone());
                body.key = Some(key.clone());
                body.code = source.code().map(str::to_string);
            }
            ApiError::Pipeline(PipelineError::Fetch { location, .. }) => match location {
                FetchLocation::Store { bucket, key } => {
                    body.bucket = Some(bucket.clone());
                    body.key = Some(key.clone());
                }
                FetchLocation::Url(url) => body.url = Some(url.clone()),
            },
            ApiError::Pipeline(PipelineError::AllSegmentsFailed { failures }) => {
                body.failures = Some(failures.iter().map(|f| f.to_report()).collect());
            }
            _ => {}
        }

        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::from_error(&self);
        (status, Json(body)).into_response()
    }
}
