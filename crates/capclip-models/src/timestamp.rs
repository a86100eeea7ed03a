//! Caption timestamp formatting and parsing.
//!
//! Two formats are produced:
//! - SubRip: `HH:MM:SS,mmm` from integer milliseconds
//! - Styled markup (ASS): `H:MM:SS.cc` from float seconds, centisecond precision
//!
//! Negative inputs are clamped to zero before formatting. Words whose absolute
//! time predates their segment's nominal start produce negative offsets after
//! upstream rounding, and those must render as `0`.

use crate::error::{ModelError, ModelResult};

/// Format milliseconds as a SubRip timestamp (`HH:MM:SS,mmm`).
///
/// # Examples
/// ```
/// use capclip_models::timestamp::to_srt_timestamp;
/// assert_eq!(to_srt_timestamp(3_723_045), "01:02:03,045");
/// assert_eq!(to_srt_timestamp(-20), "00:00:00,000");
/// ```
pub fn to_srt_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Format seconds as a styled-markup timestamp (`H:MM:SS.cc`).
///
/// Centiseconds round half-up and are capped at 99 so the field never reads `.100`.
///
/// # Examples
/// ```
/// use capclip_models::timestamp::to_caption_timestamp;
/// assert_eq!(to_caption_timestamp(62.25), "0:01:02.25");
/// assert_eq!(to_caption_timestamp(-1.0), "0:00:00.00");
/// ```
pub fn to_caption_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let whole = seconds.floor();
    let centis = (((seconds - whole) * 100.0) + 0.5).floor().min(99.0) as u64;
    let total = whole as u64;

    format!(
        "{}:{:02}:{:02}.{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        centis
    )
}

/// Parse a SubRip timestamp (`HH:MM:SS,mmm`) back to milliseconds.
pub fn parse_srt_timestamp(ts: &str) -> ModelResult<i64> {
    let invalid = || ModelError::InvalidTimestamp(ts.to_string());

    let (clock, millis) = ts.trim().split_once(',').ok_or_else(invalid)?;
    let (hours, minutes, seconds) = split_clock(clock).ok_or_else(invalid)?;
    let millis: i64 = millis.parse().map_err(|_| invalid())?;
    if !(0..1000).contains(&millis) {
        return Err(invalid());
    }

    Ok(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

/// Parse a styled-markup timestamp (`H:MM:SS.cc`) back to seconds.
pub fn parse_caption_timestamp(ts: &str) -> ModelResult<f64> {
    let invalid = || ModelError::InvalidTimestamp(ts.to_string());

    let (clock, centis) = ts.trim().split_once('.').ok_or_else(invalid)?;
    let (hours, minutes, seconds) = split_clock(clock).ok_or_else(invalid)?;
    let centis: i64 = centis.parse().map_err(|_| invalid())?;
    if !(0..100).contains(&centis) {
        return Err(invalid());
    }

    let total_centis = ((hours * 60 + minutes) * 60 + seconds) * 100 + centis;
    Ok(total_centis as f64 / 100.0)
}

fn split_clock(clock: &str) -> Option<(i64, i64, i64)> {
    let mut parts = clock.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return None;
    }
    Some((hours, minutes, seconds))
}
