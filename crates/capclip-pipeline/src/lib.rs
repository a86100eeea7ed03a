//! Clip extraction pipeline.
//!
//! This crate provides:
//! - Source resolution against per-run object-store clients
//! - The stream-then-download fetch strategy
//! - Sequential per-segment cut, caption and publish with partial success
//! - Run configuration, scratch workspaces, cancellation and run logging

pub mod cancel;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod publish;
pub mod source;
pub mod workspace;

pub use cancel::CancelSignal;
pub use config::{DefaultStore, PipelineConfig, DEFAULT_INPUT_BUCKET, DEFAULT_OUTPUT_BUCKET};
pub use error::{FetchLocation, PipelineError, PipelineResult, SegmentFailure, SegmentStage};
pub use fetch::{DownloadError, HttpDownloader, SourceDownloader};
pub use logging::RunLogger;
pub use orchestrator::{Pipeline, PipelineDeps, RunReport};
pub use publish::{output_key, Publisher};
pub use source::{MediaSource, ResolvedSource, SourceInput};
pub use workspace::Workspace;
