//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use capclip_media::CaptionOptions;
use capclip_models::{CaptionStyle, CutMode, EncodingConfig, RequestDefaults, WordTimeUnit};
use capclip_storage::StoreConfig;

use crate::error::{PipelineError, PipelineResult};

/// Default bucket the original service read public-URL sources from.
pub const DEFAULT_INPUT_BUCKET: &str = "videoliving";
/// Default bucket rendered clips are published to.
pub const DEFAULT_OUTPUT_BUCKET: &str = "shortconsottotitoli";

/// Store configured through the environment.
///
/// Publishes public-URL runs and mirrors their sources (see [`crate::fetch`]).
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultStore {
    pub config: StoreConfig,
    pub input_bucket: String,
    pub output_bucket: String,
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent directory for per-run scratch workspaces (system temp if unset)
    pub work_dir: Option<PathBuf>,
    /// Word time unit and caption style used when a request leaves them out
    pub defaults: RequestDefaults,
    pub captions: CaptionOptions,
    /// Shift caption times by each clip's probed container start offset
    pub pts_correction: bool,
    pub encoding: EncodingConfig,
    /// Per FFmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// Per source download
    pub fetch_timeout: Duration,
    pub default_store: Option<DefaultStore>,
    /// Public/CDN base URL for published keys
    pub public_base_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            defaults: RequestDefaults::default(),
            captions: CaptionOptions::default(),
            pts_correction: false,
            encoding: EncodingConfig::default(),
            ffmpeg_timeout: Duration::from_secs(600),
            fetch_timeout: Duration::from_secs(900),
            default_store: None,
            public_base_url: None,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Unknown enum values (`WORD_TIME_UNIT`, `CAPTION_STYLE`, `CUT_MODE`)
    /// are rejected instead of silently defaulted.
    pub fn from_env() -> PipelineResult<Self> {
        let defaults = Self::default();

        let word_time_unit = parse_var::<WordTimeUnit>("WORD_TIME_UNIT")?
            .unwrap_or(defaults.defaults.word_time_unit);
        let caption_style =
            parse_var::<CaptionStyle>("CAPTION_STYLE")?.unwrap_or(defaults.defaults.caption_style);
        let cut_mode = parse_var::<CutMode>("CUT_MODE")?.unwrap_or_default();

        let encoding = EncodingConfig::default()
            .with_cut_mode(cut_mode)
            .with_crf(env_or("FFMPEG_CRF", defaults.encoding.crf))
            .with_preset(
                std::env::var("FFMPEG_PRESET").unwrap_or_else(|_| defaults.encoding.preset.clone()),
            )
            .with_threads(env_or("FFMPEG_THREADS", defaults.encoding.threads));

        Ok(Self {
            work_dir: std::env::var("WORK_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            defaults: RequestDefaults {
                word_time_unit,
                caption_style,
            },
            captions: CaptionOptions {
                chunk_size: env_or("CAPTION_CHUNK_SIZE", defaults.captions.chunk_size).max(1),
                max_line_chars: env_or("CAPTION_MAX_LINE_CHARS", defaults.captions.max_line_chars),
            },
            pts_correction: std::env::var("CAPTION_PTS_CORRECTION")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            encoding,
            ffmpeg_timeout: Duration::from_secs(env_or("FFMPEG_TIMEOUT_SECS", 600)),
            fetch_timeout: Duration::from_secs(env_or("FETCH_TIMEOUT_SECS", 900)),
            default_store: default_store_from_env()?,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

/// The default store, present only when endpoint and both keys are set.
fn default_store_from_env() -> PipelineResult<Option<DefaultStore>> {
    let var = |name: &str| std::env::var(name).ok().filter(|s| !s.trim().is_empty());

    let (endpoint, access_key, secret_key) =
        match (var("R2_ENDPOINT"), var("R2_ACCESS_KEY"), var("R2_SECRET_KEY")) {
            (Some(e), Some(a), Some(s)) => (e, a, s),
            _ => return Ok(None),
        };

    let config = StoreConfig::new(endpoint, access_key, secret_key, var("R2_REGION").as_deref())
        .map_err(|e| PipelineError::config(e.to_string()))?;

    Ok(Some(DefaultStore {
        config,
        input_bucket: var("R2_INPUT_BUCKET").unwrap_or_else(|| DEFAULT_INPUT_BUCKET.to_string()),
        output_bucket: var("R2_OUTPUT_BUCKET").unwrap_or_else(|| DEFAULT_OUTPUT_BUCKET.to_string()),
    }))
}

fn parse_var<T>(name: &str) -> PipelineResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| PipelineError::config(format!("{}: {}", name, e))),
        _ => Ok(None),
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
