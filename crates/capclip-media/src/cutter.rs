//! Segment cutting and caption burn-in.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use capclip_models::{EncodingConfig, Segment};

use crate::captions::{CaptionFile, CaptionFormat};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_timing;

/// Forced style for SRT burn-in.
pub const SRT_FORCE_STYLE: &str =
    "FontSize=24,PrimaryColour=&HFFFFFF,OutlineColour=&H000000,BorderStyle=3,Outline=2,Shadow=1,MarginV=20";

/// Default FFmpeg timeout per invocation, in seconds.
pub const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 600;

/// Where the transcoder reads the source from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    /// Local file in the run's scratch workspace
    File(PathBuf),
    /// Remote URL read directly by the transcoder
    Url(String),
}

impl MediaInput {
    pub fn is_remote(&self) -> bool {
        matches!(self, MediaInput::Url(_))
    }

    fn as_input(&self) -> String {
        match self {
            MediaInput::File(path) => path.to_string_lossy().to_string(),
            MediaInput::Url(url) => url.clone(),
        }
    }
}

/// External transcoder operations used by the pipeline.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Extract `[segment.start, segment.end)` from `input` into `output`.
    async fn cut(&self, input: &MediaInput, segment: &Segment, output: &Path) -> MediaResult<()>;

    /// Burn `captions` into the video stream of `input`, copying audio.
    async fn burn(&self, input: &Path, captions: &CaptionFile, output: &Path) -> MediaResult<()>;

    /// Container start offset of a rendered file, in seconds.
    async fn probe_start_time(&self, input: &Path) -> MediaResult<f64>;
}

/// FFmpeg-backed [`Transcoder`].
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegTranscoder {
    pub fn new(encoding: EncodingConfig, timeout_secs: u64) -> Self {
        Self {
            encoding,
            runner: FfmpegRunner::new().with_timeout(timeout_secs),
        }
    }

    /// A copy of this transcoder bound to a run's cancel signal.
    pub fn with_cancel(&self, cancel_rx: watch::Receiver<bool>) -> Self {
        Self {
            encoding: self.encoding.clone(),
            runner: self.runner.clone().with_cancel(cancel_rx),
        }
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// Build the cut command for a segment.
    pub fn cut_command(&self, input: &MediaInput, segment: &Segment, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::from_input(input.as_input(), output);
        if input.is_remote() {
            cmd = cmd.input_args([
                "-reconnect",
                "1",
                "-reconnect_streamed",
                "1",
                "-reconnect_delay_max",
                "5",
            ]);
        }
        cmd.seek(segment.start)
            .duration(segment.duration())
            .output_args(self.encoding.cut_args())
            .output_args(["-movflags", "+faststart"])
    }

    /// Build the burn-in command for a caption file.
    pub fn burn_command(&self, input: &Path, captions: &CaptionFile, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .video_filter(caption_filter(captions))
            .output_args(self.encoding.video_args())
            .audio_codec("copy")
    }

    async fn run_timed(&self, operation: &'static str, cmd: &FfmpegCommand) -> MediaResult<()> {
        let started = Instant::now();
        let result = self.runner.run(cmd).await;
        metrics::histogram!("capclip_ffmpeg_duration_seconds", "operation" => operation)
            .record(started.elapsed().as_secs_f64());
        let output = result?;
        if !output.trim().is_empty() {
            debug!(operation, "FFmpeg output: {}", output.trim());
        }
        Ok(())
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(EncodingConfig::default(), DEFAULT_FFMPEG_TIMEOUT_SECS)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn cut(&self, input: &MediaInput, segment: &Segment, output: &Path) -> MediaResult<()> {
        info!(
            "Cutting segment: {} -> {} (start: {:.2}s, duration: {:.2}s, mode: {})",
            match input {
                MediaInput::File(_) => "local file",
                MediaInput::Url(_) => "remote stream",
            },
            output.display(),
            segment.start,
            segment.duration(),
            self.encoding.cut_mode
        );

        let cmd = self.cut_command(input, segment, output);
        self.run_timed("cut", &cmd).await?;

        if !output.exists() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg reported success but produced no output",
                None,
                Some(0),
            ));
        }
        Ok(())
    }

    async fn burn(&self, input: &Path, captions: &CaptionFile, output: &Path) -> MediaResult<()> {
        info!(
            "Burning captions: {} + {} -> {}",
            input.display(),
            captions.path.display(),
            output.display()
        );

        if !captions.path.exists() {
            return Err(MediaError::FileNotFound(captions.path.clone()));
        }

        let cmd = self.burn_command(input, captions, output);
        self.run_timed("burn", &cmd).await
    }

    async fn probe_start_time(&self, input: &Path) -> MediaResult<f64> {
        Ok(probe_timing(input, &self.runner).await?.start_time)
    }
}

/// Video filter that renders a caption file.
pub fn caption_filter(captions: &CaptionFile) -> String {
    let path = escape_filter_path(&captions.path);
    match captions.format {
        CaptionFormat::Srt => format!("subtitles=filename={}:force_style='{}'", path, SRT_FORCE_STYLE),
        CaptionFormat::Ass => format!("ass=filename={}", path),
    }
}

/// Escape a path for use as a filter option value.
fn escape_filter_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '\\' => escaped.push('/'),
            ':' | '\'' | ',' | ';' | '[' | ']' | '=' => {
                escaped.push('\\');
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
