//! Shared data models for the CapClip backend.
//!
//! This crate provides Serde-serializable types for:
//! - Segments, transcript words and keyword sets
//! - Clip sources (object store or public URL)
//! - The `/process` wire request, its validation, and the response shape
//! - Caption timestamp formatting
//! - Encoding configuration for cuts and burn-in

pub mod caption;
pub mod encoding;
pub mod error;
pub mod request;
pub mod response;
pub mod segment;
pub mod source;
pub mod timestamp;
pub mod transcript;

// Re-export common types
pub use caption::CaptionStyle;
pub use encoding::{CutMode, EncodingConfig};
pub use error::{ModelError, ModelResult};
pub use request::{
    ProcessRequest, RequestDefaults, S3ConfigPayload, SegmentSelection, SubtitlePayload,
    ValidatedRequest, WordPayload,
};
pub use response::{ProcessResponse, SegmentFailureReport, SegmentResult};
pub use segment::Segment;
pub use source::{
    basename, normalize_region, object_key_from_url, ClipSource, ObjectStoreSource,
    PublicUrlSource, StoreCredentials, DEFAULT_REGION,
};
pub use timestamp::{to_caption_timestamp, to_srt_timestamp};
pub use transcript::{KeywordSet, Word, WordTimeUnit, MAX_WORD_MS};
