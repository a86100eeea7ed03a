//! Caption synthesis and FFmpeg CLI wrapper for clip rendering.
//!
//! This crate provides:
//! - Word chunking and SRT / ASS caption synthesis
//! - Type-safe FFmpeg command building
//! - Cancellation and timeouts via tokio
//! - Segment cutting (stream copy or re-encode), caption burn-in and probing

pub mod captions;
pub mod command;
pub mod cutter;
pub mod error;
pub mod probe;

pub use captions::{
    words_in_window, CaptionDocument, CaptionFile, CaptionFormat, CaptionOptions,
    SubtitleSynthesizer, Timeline,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use cutter::{FfmpegTranscoder, MediaInput, Transcoder, SRT_FORCE_STYLE};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_timing, MediaTiming};
