//! Caption synthesis from word-level transcripts.
//!
//! Words are grouped into chunks ([`chunker`]) and rendered as SRT
//! ([`srt`]) or as styled ASS markup ([`ass`]). All emitted times are
//! relative to the segment start and clamped at zero.

pub mod ass;
pub mod chunker;
pub mod srt;

use std::path::{Path, PathBuf};

use capclip_models::{CaptionStyle, KeywordSet, Segment, Word};

use crate::error::MediaResult;

pub use ass::{render_ass, AssLayout, AssStyle};
pub use chunker::{chunk_words, CaptionChunk, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_LINE_CHARS};
pub use srt::render_srt;

/// Maps absolute transcript time to caption time inside one clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    /// Absolute segment start in milliseconds
    origin_ms: i64,
    /// Added after clamping (container start offset of the clip)
    offset_ms: i64,
}

impl Timeline {
    pub fn new(origin_ms: i64, offset_ms: i64) -> Self {
        Self {
            origin_ms,
            offset_ms: offset_ms.max(0),
        }
    }

    /// Timeline for a segment, shifted by a probed start offset in seconds.
    pub fn for_segment(segment: &Segment, offset_secs: f64) -> Self {
        let offset_ms = if offset_secs.is_finite() {
            (offset_secs * 1000.0).round() as i64
        } else {
            0
        };
        Self::new(segment.start_ms(), offset_ms)
    }

    /// Segment-relative milliseconds, never negative.
    pub fn relative_ms(&self, absolute_ms: i64) -> i64 {
        absolute_ms.saturating_sub(self.origin_ms).max(0) + self.offset_ms
    }

    /// Segment-relative seconds, never negative.
    pub fn relative_secs(&self, absolute_ms: i64) -> f64 {
        self.relative_ms(absolute_ms) as f64 / 1000.0
    }
}

/// On-disk caption format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    Srt,
    Ass,
}

impl CaptionFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CaptionFormat::Srt => "srt",
            CaptionFormat::Ass => "ass",
        }
    }
}

/// A rendered caption document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionDocument {
    pub format: CaptionFormat,
    pub contents: String,
}

impl CaptionDocument {
    /// A caller-supplied SRT document, used as-is.
    pub fn srt(contents: impl Into<String>) -> Self {
        Self {
            format: CaptionFormat::Srt,
            contents: contents.into(),
        }
    }

    /// Write the document to `dir/{stem}.{ext}`.
    pub async fn write_to(&self, dir: &Path, stem: &str) -> MediaResult<CaptionFile> {
        let path = dir.join(format!("{}.{}", stem, self.format.extension()));
        tokio::fs::write(&path, self.contents.as_bytes()).await?;
        Ok(CaptionFile {
            path,
            format: self.format,
        })
    }
}

/// A caption document on disk, ready to burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionFile {
    pub path: PathBuf,
    pub format: CaptionFormat,
}

/// Chunking and layout knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionOptions {
    pub chunk_size: usize,
    pub max_line_chars: usize,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_line_chars: DEFAULT_MAX_LINE_CHARS,
        }
    }
}

/// Builds caption documents for one segment at a time.
#[derive(Debug, Clone, Default)]
pub struct SubtitleSynthesizer {
    options: CaptionOptions,
}

impl SubtitleSynthesizer {
    pub fn new(options: CaptionOptions) -> Self {
        Self { options }
    }

    /// Render `words` for a clip; `None` when there is nothing to show.
    pub fn build(
        &self,
        style: CaptionStyle,
        words: &[Word],
        keywords: &KeywordSet,
        timeline: &Timeline,
    ) -> Option<CaptionDocument> {
        if words.is_empty() {
            return None;
        }

        let chunks = chunk_words(words, self.options.chunk_size);
        let (format, contents) = match style {
            CaptionStyle::Srt => (CaptionFormat::Srt, render_srt(&chunks, timeline)),
            CaptionStyle::Karaoke => (
                CaptionFormat::Ass,
                render_ass(&chunks, keywords, timeline, self.options.max_line_chars, AssLayout::Uniform),
            ),
            CaptionStyle::Highlight => (
                CaptionFormat::Ass,
                render_ass(&chunks, keywords, timeline, self.options.max_line_chars, AssLayout::TwoLayer),
            ),
        };

        let has_events = match format {
            CaptionFormat::Srt => !contents.is_empty(),
            CaptionFormat::Ass => contents.contains("\nDialogue:"),
        };
        has_events.then_some(CaptionDocument { format, contents })
    }
}

/// Words overlapping a segment window, in transcript order.
pub fn words_in_window(words: &[Word], segment: &Segment) -> Vec<Word> {
    let (start, end) = (segment.start_ms(), segment.end_ms());
    words
        .iter()
        .filter(|w| w.overlaps(start, end))
        .cloned()
        .collect()
}
