//! Pipeline metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_TOTAL: &str = "capclip_runs_total";
    pub const SEGMENTS_PUBLISHED_TOTAL: &str = "capclip_segments_published_total";
    pub const SEGMENTS_FAILED_TOTAL: &str = "capclip_segments_failed_total";
    pub const FALLBACK_DOWNLOADS_TOTAL: &str = "capclip_fallback_downloads_total";
    pub const CAPTION_FALLBACKS_TOTAL: &str = "capclip_caption_fallbacks_total";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "capclip_download_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "capclip_upload_duration_seconds";
}

/// Record a finished run by outcome (`success` or an error kind).
pub fn record_run(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
}

/// Record a published segment.
pub fn record_segment_published(captioned: bool) {
    let labels = [("captioned", captioned.to_string())];
    counter!(names::SEGMENTS_PUBLISHED_TOTAL, &labels).increment(1);
}

/// Record a failed segment.
pub fn record_segment_failed(stage: &str) {
    let labels = [("stage", stage.to_string())];
    counter!(names::SEGMENTS_FAILED_TOTAL, &labels).increment(1);
}

/// Record a streaming cut that fell back to a full download.
pub fn record_fallback_download() {
    counter!(names::FALLBACK_DOWNLOADS_TOTAL).increment(1);
}

/// Record a segment published without captions after a caption failure.
pub fn record_caption_fallback() {
    counter!(names::CAPTION_FALLBACKS_TOTAL).increment(1);
}

/// Record source download duration.
pub fn record_download_duration(source: &str, duration_secs: f64) {
    let labels = [("source", source.to_string())];
    histogram!(names::DOWNLOAD_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record upload duration.
pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}
