//! Application state.

use std::sync::Arc;

use capclip_media::FfmpegTranscoder;
use capclip_pipeline::{HttpDownloader, PipelineConfig, SourceDownloader};
use capclip_storage::{R2StoreProvider, StoreProvider};

use crate::config::ApiConfig;

/// Shared application state.
///
/// Store clients are built per request from [`StoreProvider`]; nothing here
/// holds request-specific credentials.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<PipelineConfig>,
    /// Bound to each request's cancel signal before use
    pub transcoder: FfmpegTranscoder,
    pub stores: Arc<dyn StoreProvider>,
    pub downloader: Arc<dyn SourceDownloader>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig, pipeline: PipelineConfig) -> anyhow::Result<Self> {
        let transcoder =
            FfmpegTranscoder::new(pipeline.encoding.clone(), pipeline.ffmpeg_timeout.as_secs());
        let downloader = HttpDownloader::new(pipeline.fetch_timeout)?;

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            transcoder,
            stores: Arc::new(R2StoreProvider),
            downloader: Arc::new(downloader),
        })
    }
}
