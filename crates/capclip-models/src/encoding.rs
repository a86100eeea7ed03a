//! Video encoding configuration for cuts and caption burn-in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Default encoder thread cap
pub const DEFAULT_THREADS: u16 = 2;

/// How a segment is cut out of its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CutMode {
    /// `-c copy`: no re-encode, cut points snap to keyframes.
    #[default]
    Copy,
    /// Fixed-quality re-encode with exact boundaries.
    Reencode,
}

impl fmt::Display for CutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutMode::Copy => write!(f, "copy"),
            CutMode::Reencode => write!(f, "reencode"),
        }
    }
}

impl FromStr for CutMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "copy" | "stream_copy" => Ok(CutMode::Copy),
            "reencode" | "re-encode" | "encode" => Ok(CutMode::Reencode),
            other => Err(ModelError::unknown_variant("cut mode", other)),
        }
    }
}

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Cutting mode
    #[serde(default)]
    pub cut_mode: CutMode,

    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "veryfast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Encoder thread cap
    #[serde(default = "default_threads")]
    pub threads: u16,

    /// Audio codec used when re-encoding
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate used when re-encoding
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_threads() -> u16 {
    DEFAULT_THREADS
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            cut_mode: CutMode::default(),
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            threads: DEFAULT_THREADS,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
        }
    }
}

impl EncodingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with updated cut mode.
    pub fn with_cut_mode(mut self, cut_mode: CutMode) -> Self {
        self.cut_mode = cut_mode;
        self
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Returns a new config with updated preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Returns a new config with updated thread cap.
    pub fn with_threads(mut self, threads: u16) -> Self {
        self.threads = threads;
        self
    }

    /// Video encoder arguments (`-c:v`, `-preset`, `-crf`, `-threads`).
    pub fn video_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
        ];
        if self.threads > 0 {
            args.extend_from_slice(&["-threads".to_string(), self.threads.to_string()]);
        }
        args
    }

    /// Output arguments for cutting a segment in the configured mode.
    pub fn cut_args(&self) -> Vec<String> {
        match self.cut_mode {
            CutMode::Copy => vec![
                "-c".to_string(),
                "copy".to_string(),
                "-avoid_negative_ts".to_string(),
                "make_zero".to_string(),
            ],
            CutMode::Reencode => {
                let mut args = self.video_args();
                args.extend_from_slice(&[
                    "-c:a".to_string(),
                    self.audio_codec.clone(),
                    "-b:a".to_string(),
                    self.audio_bitrate.clone(),
                ]);
                args
            }
        }
    }
}
