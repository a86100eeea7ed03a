//! Per-request pipeline run.
//!
//! A run moves through `resolve → fetch → (cut → caption → publish)*` with
//! segments processed sequentially in index order. Resolution and fetch
//! failures end the run; cut and publish failures are recorded against their
//! segment and the run moves on. Caption failures degrade to publishing the
//! uncaptioned cut.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, Instrument};

use capclip_media::{
    words_in_window, CaptionDocument, MediaError, SubtitleSynthesizer, Timeline, Transcoder,
};
use capclip_models::{ProcessResponse, Segment, SegmentResult, ValidatedRequest};
use capclip_storage::StoreProvider;

use crate::cancel::CancelSignal;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, SegmentFailure, SegmentStage};
use crate::fetch::{CutError, FetchPlan, Fetcher, SourceDownloader};
use crate::logging::RunLogger;
use crate::metrics;
use crate::publish::{output_key, Publisher};
use crate::source::{MediaSource, ResolvedSource};
use crate::workspace::Workspace;

/// External collaborators of a run.
#[derive(Clone)]
pub struct PipelineDeps {
    pub transcoder: Arc<dyn Transcoder>,
    pub stores: Arc<dyn StoreProvider>,
    pub downloader: Arc<dyn SourceDownloader>,
}

/// Outcome of a run that published at least one segment.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub request_id: String,
    pub results: Vec<SegmentResult>,
    pub failures: Vec<SegmentFailure>,
}

impl RunReport {
    pub fn into_response(self) -> ProcessResponse {
        let failures = self.failures.iter().map(SegmentFailure::to_report).collect();
        ProcessResponse::new(self.results, failures)
    }
}

/// How one segment ended when it did not publish.
enum SegmentError {
    /// Recorded; the run continues.
    Failed(SegmentFailure),
    /// Ends the run.
    Fatal(PipelineError),
}

impl From<PipelineError> for SegmentError {
    fn from(e: PipelineError) -> Self {
        SegmentError::Fatal(e)
    }
}

/// Borrowed state shared by the segments of one run.
struct RunContext<'a> {
    request: &'a ValidatedRequest,
    resolved: &'a ResolvedSource,
    workspace: &'a Workspace,
    fetcher: Fetcher<'a>,
    plan: FetchPlan,
    publisher: Publisher,
    cancel: &'a CancelSignal,
    logger: &'a RunLogger,
}

/// The clip pipeline.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    deps: PipelineDeps,
    synthesizer: SubtitleSynthesizer,
}

impl Pipeline {
    pub fn new(config: Arc<PipelineConfig>, deps: PipelineDeps) -> Self {
        let synthesizer = SubtitleSynthesizer::new(config.captions);
        Self {
            config,
            deps,
            synthesizer,
        }
    }

    /// Execute a validated request.
    ///
    /// The scratch workspace is removed on every exit path, including
    /// cancellation (the future being dropped).
    pub async fn run(
        &self,
        request: &ValidatedRequest,
        cancel: &CancelSignal,
        logger: &RunLogger,
    ) -> PipelineResult<RunReport> {
        let span = logger.create_span();
        let result = self.execute(request, cancel, logger).instrument(span).await;

        match &result {
            Ok(report) => {
                metrics::record_run("success");
                logger.log_completion(report.results.len(), report.failures.len());
            }
            Err(e) => {
                metrics::record_run(e.kind());
                logger.log_error(&e.to_string());
            }
        }

        result
    }

    async fn execute(
        &self,
        request: &ValidatedRequest,
        cancel: &CancelSignal,
        logger: &RunLogger,
    ) -> PipelineResult<RunReport> {
        let indices = request.selection.indices(request.segments.len());
        logger.log_start(&format!(
            "{} of {} segment(s) from {} ({} captions)",
            indices.len(),
            request.segments.len(),
            request.source.source_key(),
            request.caption_style
        ));

        // Resolving
        cancel.check()?;
        let source = MediaSource::new(&self.config, self.deps.stores.as_ref());
        let resolved = source.resolve(request)?;
        cancel.guard(source.existence_check(&resolved)).await?;

        // Fetching
        let workspace = Workspace::create(self.config.work_dir.as_deref()).await?;
        let fetcher = Fetcher::new(
            &workspace,
            self.deps.downloader.as_ref(),
            self.deps.transcoder.as_ref(),
            cancel,
            self.config.fetch_timeout,
            &resolved.source_key,
        );
        let plan = fetcher.materialize(&resolved.input).await?;

        let ctx = RunContext {
            request,
            resolved: &resolved,
            workspace: &workspace,
            fetcher,
            plan,
            publisher: Publisher::new(&resolved.output, self.config.public_base_url.clone()),
            cancel,
            logger,
        };

        let mut results = Vec::with_capacity(indices.len());
        let mut failures = Vec::new();

        for index in indices {
            cancel.check()?;
            match self.process_segment(&ctx, index).await {
                Ok(result) => results.push(result),
                Err(SegmentError::Failed(failure)) => {
                    metrics::record_segment_failed(failure.stage.as_str());
                    logger.log_warning(index, failure.stage.as_str(), &failure.error);
                    failures.push(failure);
                }
                Err(SegmentError::Fatal(e)) => return Err(e),
            }
        }

        if results.is_empty() {
            return Err(PipelineError::AllSegmentsFailed { failures });
        }

        Ok(RunReport {
            request_id: logger.request_id().to_string(),
            results,
            failures,
        })
    }

    async fn process_segment(
        &self,
        ctx: &RunContext<'_>,
        index: usize,
    ) -> Result<SegmentResult, SegmentError> {
        let segment = &ctx.request.segments[index];
        let source_key = ctx.resolved.source_key.as_str();

        // Cutting(i)
        ctx.logger.log_progress(
            index,
            SegmentStage::Cut.as_str(),
            &format!("{:.2}s - {:.2}s", segment.start, segment.end),
        );
        let cut_path = ctx.workspace.cut_path(index, source_key);
        match ctx.fetcher.cut(&ctx.plan, segment, &cut_path).await {
            Ok(outcome) if outcome.used_fallback => {
                ctx.logger
                    .log_progress(index, SegmentStage::Cut.as_str(), "Cut from downloaded copy");
            }
            Ok(_) => {}
            Err(CutError::Segment(e)) => {
                return Err(SegmentError::Failed(SegmentFailure::from_media(
                    index,
                    SegmentStage::Cut,
                    &e,
                )));
            }
            Err(CutError::Fatal(e)) => return Err(SegmentError::Fatal(e)),
        }

        // Captioning(i)
        ctx.cancel.check()?;
        let (final_path, captioned) = self.caption_segment(ctx, index, segment, &cut_path).await?;

        // Publishing(i)
        ctx.cancel.check()?;
        let key = output_key(ctx.request.result_index(index), source_key);
        let upload = ctx
            .cancel
            .guard(async { Ok(ctx.publisher.publish(&final_path, &key).await) })
            .await?;

        remove_scratch(&[cut_path.as_path(), final_path.as_path()]).await;

        let url = upload.map_err(|e| {
            SegmentError::Failed(SegmentFailure::new(
                index,
                SegmentStage::Publish,
                format!("Upload to {}/{} failed: {}", ctx.publisher.bucket(), key, e),
            ))
        })?;

        metrics::record_segment_published(captioned);
        ctx.logger.log_progress(index, SegmentStage::Publish.as_str(), &url);

        Ok(SegmentResult {
            segment: ctx.request.result_index(index),
            url,
            duration: segment.duration(),
        })
    }

    /// Burn captions into a cut, returning the file to publish and whether
    /// it carries captions.
    async fn caption_segment(
        &self,
        ctx: &RunContext<'_>,
        index: usize,
        segment: &Segment,
        cut_path: &Path,
    ) -> PipelineResult<(PathBuf, bool)> {
        let document = match ctx.request.subtitles.get(&index) {
            Some(srt) => Some(CaptionDocument::srt(srt.as_str())),
            None => {
                let words = words_in_window(&ctx.request.words, segment);
                if words.is_empty() {
                    None
                } else {
                    let offset = self.start_offset(ctx, index, cut_path).await?;
                    self.synthesizer.build(
                        ctx.request.caption_style,
                        &words,
                        &ctx.request.keywords,
                        &Timeline::for_segment(segment, offset),
                    )
                }
            }
        };

        let Some(document) = document else {
            return Ok((cut_path.to_path_buf(), false));
        };

        let captions = match document
            .write_to(ctx.workspace.path(), &ctx.workspace.caption_stem(index))
            .await
        {
            Ok(file) => file,
            Err(e) => {
                self.caption_fallback(ctx, index, &e);
                return Ok((cut_path.to_path_buf(), false));
            }
        };

        let output = ctx.workspace.output_path(index, &ctx.resolved.source_key);
        match self.deps.transcoder.burn(cut_path, &captions, &output).await {
            Ok(()) => Ok((output, true)),
            Err(e) if e.is_cancelled() => Err(PipelineError::Cancelled),
            Err(e) => {
                self.caption_fallback(ctx, index, &e);
                Ok((cut_path.to_path_buf(), false))
            }
        }
    }

    /// Container start offset of a cut, when correction is enabled.
    async fn start_offset(
        &self,
        ctx: &RunContext<'_>,
        index: usize,
        cut_path: &Path,
    ) -> PipelineResult<f64> {
        if !self.config.pts_correction {
            return Ok(0.0);
        }

        match self.deps.transcoder.probe_start_time(cut_path).await {
            Ok(offset) if offset.is_finite() && offset > 0.0 => Ok(offset),
            Ok(_) => Ok(0.0),
            Err(e) if e.is_cancelled() => Err(PipelineError::Cancelled),
            Err(e) => {
                ctx.logger.log_warning(
                    index,
                    "caption",
                    &format!("Start offset probe failed, using 0: {}", e),
                );
                Ok(0.0)
            }
        }
    }

    fn caption_fallback(&self, ctx: &RunContext<'_>, index: usize, error: &MediaError) {
        metrics::record_caption_fallback();
        ctx.logger.log_warning(
            index,
            "caption",
            &format!("Publishing uncaptioned cut: {}", error.detailed()),
        );
    }
}

async fn remove_scratch(paths: &[&Path]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("Failed to remove scratch file {}: {}", path.display(), e);
            }
        }
    }
}
