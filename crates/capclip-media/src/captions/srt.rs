//! SRT (SubRip) caption rendering.

use std::fmt::Write;

use capclip_models::to_srt_timestamp;

use super::chunker::CaptionChunk;
use super::Timeline;

/// Render chunks as numbered SRT blocks with segment-relative timing.
///
/// Chunks whose relative span collapses to nothing are dropped and the
/// numbering stays contiguous.
pub fn render_srt(chunks: &[CaptionChunk<'_>], timeline: &Timeline) -> String {
    let mut output = String::new();
    let mut index = 1;

    for chunk in chunks {
        let start = timeline.relative_ms(chunk.start_ms());
        let end = timeline.relative_ms(chunk.end_ms());
        if end <= start {
            continue;
        }

        let _ = write!(
            output,
            "{}\n{} --> {}\n{}\n\n",
            index,
            to_srt_timestamp(start),
            to_srt_timestamp(end),
            chunk.text()
        );
        index += 1;
    }

    output
}
