//! Pipeline error types.

use std::fmt;

use thiserror::Error;

use capclip_media::MediaError;
use capclip_models::{ModelError, SegmentFailureReport};
use capclip_storage::StorageError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that end a run without results.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source resolution failed for {bucket}/{key}: {source}")]
    Resolution {
        bucket: String,
        key: String,
        source: StorageError,
    },

    #[error("Fetch failed for {location}: {message}")]
    Fetch {
        location: FetchLocation,
        message: String,
    },

    #[error("All {} requested segments failed", .failures.len())]
    AllSegmentsFailed { failures: Vec<SegmentFailure> },

    #[error("Request cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn fetch(location: FetchLocation, message: impl Into<String>) -> Self {
        Self::Fetch {
            location,
            message: message.into(),
        }
    }

    /// Short machine-readable kind for responses, logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::Resolution { source, .. } if source.is_not_found() => "not_found",
            Self::Resolution { source, .. } if source.is_access_denied() => "access_denied",
            Self::Resolution { .. } => "resolution",
            Self::Fetch { .. } => "fetch",
            Self::AllSegmentsFailed { .. } => "all_segments_failed",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
        }
    }
}

/// Where a failed fetch was reading from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchLocation {
    Store { bucket: String, key: String },
    Url(String),
}

impl fmt::Display for FetchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchLocation::Store { bucket, key } => write!(f, "{}/{}", bucket, key),
            FetchLocation::Url(url) => f.write_str(url),
        }
    }
}

/// Stage at which a segment was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStage {
    Cut,
    Publish,
}

impl SegmentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStage::Cut => "cut",
            SegmentStage::Publish => "publish",
        }
    }
}

impl fmt::Display for SegmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A segment-local failure; the run carries on past it.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFailure {
    pub index: usize,
    pub stage: SegmentStage,
    /// Error text, including captured tool output when there is any
    pub error: String,
}

impl SegmentFailure {
    pub fn new(index: usize, stage: SegmentStage, error: impl Into<String>) -> Self {
        Self {
            index,
            stage,
            error: error.into(),
        }
    }

    pub fn from_media(index: usize, stage: SegmentStage, error: &MediaError) -> Self {
        Self::new(index, stage, error.detailed())
    }

    pub fn to_report(&self) -> SegmentFailureReport {
        SegmentFailureReport {
            segment: self.index,
            stage: self.stage.to_string(),
            error: self.error.clone(),
        }
    }
}
