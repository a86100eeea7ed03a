//! Validation error types.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating an inbound request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Missing segments")]
    MissingSegments,

    #[error("Missing video_url or s3_config")]
    MissingSource,

    #[error("Missing s3_config field: {0}")]
    MissingSourceField(&'static str),

    #[error("Invalid segment {index}: {reason}")]
    InvalidSegment { index: usize, reason: String },

    #[error("segment_index {index} out of range ({count} segments)")]
    SegmentIndexOutOfRange { index: usize, count: usize },

    #[error("Invalid word {index}: {reason}")]
    InvalidWord { index: usize, reason: String },

    #[error("Invalid video_url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

impl ModelError {
    pub fn invalid_segment(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidSegment {
            index,
            reason: reason.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_variant(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}
