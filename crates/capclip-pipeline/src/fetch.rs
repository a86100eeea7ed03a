//! Materializing source bytes for the cutter.
//!
//! The strategy is explicit: an object-store source is downloaded once up
//! front ([`FetchPlan::Local`]); a public URL is streamed into each cut
//! ([`FetchPlan::Stream`]) and a full download happens only when that cut
//! exits non-zero or times out. The fallback copy is deleted right after its
//! cut.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use capclip_media::{MediaError, MediaInput, Transcoder};
use capclip_models::Segment;

use crate::cancel::CancelSignal;
use crate::error::{FetchLocation, PipelineError, PipelineResult};
use crate::metrics;
use crate::source::{SourceInput, StoreObject};
use crate::workspace::Workspace;

/// Errors from fetching a URL.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => Self::Request(e.to_string()),
        }
    }
}

/// Full sequential download of a URL to a local file.
#[async_trait]
pub trait SourceDownloader: Send + Sync {
    /// Download `url` to `path`, returning the bytes written.
    async fn download(&self, url: &str, path: &Path) -> Result<u64, DownloadError>;
}

/// [`SourceDownloader`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceDownloader for HttpDownloader {
    async fn download(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

/// How segments read the source.
#[derive(Clone)]
pub enum FetchPlan {
    /// The whole source is in the workspace.
    Local(PathBuf),
    /// Stream the URL into each cut; download on cut failure.
    Stream {
        url: String,
        mirror: Option<StoreObject>,
    },
}

/// Outcome of cutting one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutOutcome {
    /// The streamed cut failed and the segment was cut from a download
    pub used_fallback: bool,
}

/// Why a segment could not be cut.
#[derive(Debug)]
pub enum CutError {
    /// Segment-local; the run continues.
    Segment(MediaError),
    /// No source bytes are obtainable; the run ends.
    Fatal(PipelineError),
}

/// Fetch strategy bound to one run.
pub struct Fetcher<'a> {
    workspace: &'a Workspace,
    downloader: &'a dyn SourceDownloader,
    transcoder: &'a dyn Transcoder,
    cancel: &'a CancelSignal,
    fetch_timeout: Duration,
    source_key: &'a str,
}

impl<'a> Fetcher<'a> {
    pub fn new(
        workspace: &'a Workspace,
        downloader: &'a dyn SourceDownloader,
        transcoder: &'a dyn Transcoder,
        cancel: &'a CancelSignal,
        fetch_timeout: Duration,
        source_key: &'a str,
    ) -> Self {
        Self {
            workspace,
            downloader,
            transcoder,
            cancel,
            fetch_timeout,
            source_key,
        }
    }

    /// Decide the plan, downloading object-store sources up front.
    pub async fn materialize(&self, input: &SourceInput) -> PipelineResult<FetchPlan> {
        match input {
            SourceInput::Store(object) => {
                let path = self.workspace.source_path(&object.key);
                self.download_from_store(object, &path)
                    .await?
                    .map_err(|message| {
                        PipelineError::fetch(
                            FetchLocation::Store {
                                bucket: object.bucket.clone(),
                                key: object.key.clone(),
                            },
                            message,
                        )
                    })?;
                Ok(FetchPlan::Local(path))
            }
            SourceInput::Url { url, mirror } => Ok(FetchPlan::Stream {
                url: url.clone(),
                mirror: mirror.clone(),
            }),
        }
    }

    /// Cut one segment according to the plan.
    pub async fn cut(
        &self,
        plan: &FetchPlan,
        segment: &Segment,
        output: &Path,
    ) -> Result<CutOutcome, CutError> {
        match plan {
            FetchPlan::Local(path) => {
                self.transcoder
                    .cut(&MediaInput::File(path.clone()), segment, output)
                    .await
                    .map_err(classify_cut_error)?;
                Ok(CutOutcome {
                    used_fallback: false,
                })
            }
            FetchPlan::Stream { url, mirror } => {
                match self
                    .transcoder
                    .cut(&MediaInput::Url(url.clone()), segment, output)
                    .await
                {
                    Ok(()) => Ok(CutOutcome {
                        used_fallback: false,
                    }),
                    Err(e @ (MediaError::FfmpegFailed { .. } | MediaError::Timeout(_))) => {
                        warn!(url = %url, "Streaming cut failed, falling back to download: {}", e);
                        self.cut_from_download(url, mirror.as_ref(), segment, output)
                            .await?;
                        Ok(CutOutcome {
                            used_fallback: true,
                        })
                    }
                    Err(e) => Err(classify_cut_error(e)),
                }
            }
        }
    }

    async fn cut_from_download(
        &self,
        url: &str,
        mirror: Option<&StoreObject>,
        segment: &Segment,
        output: &Path,
    ) -> Result<(), CutError> {
        metrics::record_fallback_download();

        let local = self.workspace.source_path(self.source_key);
        self.download_public(url, mirror, &local)
            .await
            .map_err(CutError::Fatal)?;

        let result = self
            .transcoder
            .cut(&MediaInput::File(local.clone()), segment, output)
            .await;

        if let Err(e) = tokio::fs::remove_file(&local).await {
            warn!("Failed to remove fallback copy {}: {}", local.display(), e);
        }

        result.map_err(classify_cut_error)
    }

    /// Download a public source, trying the URL first and then its mirror.
    async fn download_public(
        &self,
        url: &str,
        mirror: Option<&StoreObject>,
        path: &Path,
    ) -> PipelineResult<()> {
        let started = Instant::now();
        let http = self
            .timed(async {
                self.downloader
                    .download(url, path)
                    .await
                    .map_err(|e| e.to_string())
            })
            .await?;

        let http_error = match http {
            Ok(bytes) => {
                metrics::record_download_duration("url", started.elapsed().as_secs_f64());
                info!(url = %url, bytes, "Downloaded source for fallback cut");
                return Ok(());
            }
            Err(message) => message,
        };
        remove_partial(path).await;

        let Some(mirror) = mirror else {
            return Err(PipelineError::fetch(FetchLocation::Url(url.to_string()), http_error));
        };

        warn!(
            url = %url,
            bucket = %mirror.bucket,
            key = %mirror.key,
            "URL download failed ({}), trying the store copy",
            http_error
        );

        self.download_from_store(mirror, path)
            .await?
            .map_err(|store_error| {
                PipelineError::fetch(
                    FetchLocation::Url(url.to_string()),
                    format!(
                        "{}; store copy {}/{}: {}",
                        http_error, mirror.bucket, mirror.key, store_error
                    ),
                )
            })
    }

    /// Download an object; the outer error is cancellation only.
    async fn download_from_store(
        &self,
        object: &StoreObject,
        path: &Path,
    ) -> PipelineResult<Result<(), String>> {
        let started = Instant::now();
        let result = self
            .timed(async {
                object
                    .store
                    .download_file(&object.bucket, &object.key, path)
                    .await
                    .map_err(|e| e.to_string())
            })
            .await?;

        Ok(match result {
            Ok(bytes) => {
                metrics::record_download_duration("store", started.elapsed().as_secs_f64());
                info!(bucket = %object.bucket, key = %object.key, bytes, "Downloaded source");
                Ok(())
            }
            Err(message) => {
                remove_partial(path).await;
                Err(message)
            }
        })
    }

    /// Apply the fetch timeout and the cancel signal to a transfer.
    ///
    /// The outer result is fatal (cancelled); the inner one is the transfer's.
    async fn timed<F, T>(&self, fut: F) -> PipelineResult<Result<T, String>>
    where
        F: std::future::Future<Output = Result<T, String>>,
    {
        let timeout = self.fetch_timeout;
        self.cancel
            .guard(async move {
                Ok(match tokio::time::timeout(timeout, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(format!("timed out after {} seconds", timeout.as_secs())),
                })
            })
            .await
    }
}

fn classify_cut_error(e: MediaError) -> CutError {
    if e.is_cancelled() {
        CutError::Fatal(PipelineError::Cancelled)
    } else {
        CutError::Segment(e)
    }
}

async fn remove_partial(path: &Path) {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let _ = tokio::fs::remove_file(path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos/a.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.mp4");
        let downloader = HttpDownloader::new(Duration::from_secs(10)).unwrap();
        let written = downloader
            .download(&format!("{}/videos/a.mp4", server.uri()), &target)
            .await
            .unwrap();

        assert_eq!(written, 4096);
        assert_eq!(std::fs::read(&target).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_http_download_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = HttpDownloader::new(Duration::from_secs(10)).unwrap();
        let err = downloader
            .download(&format!("{}/missing.mp4", server.uri()), &dir.path().join("x.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 404, .. }));
    }

    #[test]
    fn test_cancelled_cut_is_fatal() {
        assert!(matches!(
            classify_cut_error(MediaError::Cancelled),
            CutError::Fatal(PipelineError::Cancelled)
        ));
        assert!(matches!(
            classify_cut_error(MediaError::Timeout(5)),
            CutError::Segment(MediaError::Timeout(5))
        ));
    }
}
