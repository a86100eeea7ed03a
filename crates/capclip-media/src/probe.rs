//! FFprobe stream information.

use serde::Deserialize;
use std::path::Path;

use crate::command::{check_ffprobe, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Container timing of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaTiming {
    /// Container start offset in seconds (first packet PTS)
    pub start_time: f64,
    /// Duration in seconds
    pub duration: f64,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    start_time: Option<String>,
    duration: Option<String>,
}

/// Probe a file for its container start time and duration.
pub async fn probe_timing(path: impl AsRef<Path>, runner: &FfmpegRunner) -> MediaResult<MediaTiming> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let program = check_ffprobe()?;
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_entries".to_string(),
        "format=start_time,duration".to_string(),
        path.to_string_lossy().to_string(),
    ];

    let output = runner.run_program(&program, &args).await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_timing(&output.stdout)
}

fn parse_timing(json: &[u8]) -> MediaResult<MediaTiming> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let parse = |value: &Option<String>| {
        value
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    };

    Ok(MediaTiming {
        start_time: parse(&probe.format.start_time).max(0.0),
        duration: parse(&probe.format.duration),
    })
}
