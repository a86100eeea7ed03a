//! End-to-end runs of the pipeline over fakes.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::watch;

use capclip_media::{CaptionFormat, MediaInput};
use capclip_models::{ProcessRequest, RequestDefaults, ValidatedRequest};
use capclip_pipeline::{
    CancelSignal, FetchLocation, Pipeline, PipelineConfig, PipelineError, RunLogger, RunReport,
    SegmentStage,
};

use super::fakes::{test_config, FakeDownloader, FakeTranscoder, Harness, MemoryStore};

const SOURCE_BUCKET: &str = "uploads";
const SOURCE_KEY: &str = "shows/ep1.mp4";
const OUTPUT_BUCKET: &str = "shortconsottotitoli";

fn s3_request(extra: Value) -> ValidatedRequest {
    let mut body = json!({
        "s3_config": {
            "endpoint": "https://acct.r2.cloudflarestorage.com",
            "accessKeyId": "AKIA",
            "secretAccessKey": "secret",
            "region": "auto",
            "bucket": SOURCE_BUCKET,
            "key": SOURCE_KEY
        }
    });
    merge(&mut body, extra);
    validate(body)
}

fn url_request(extra: Value) -> ValidatedRequest {
    let mut body = json!({ "video_url": "https://cdn.example.com/videos/ep1.mp4?sig=abc" });
    merge(&mut body, extra);
    validate(body)
}

fn merge(body: &mut Value, extra: Value) {
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
}

fn validate(body: Value) -> ValidatedRequest {
    serde_json::from_value::<ProcessRequest>(body)
        .unwrap()
        .validate(RequestDefaults::default())
        .unwrap()
}

async fn run(
    harness: &Harness,
    config: PipelineConfig,
    request: &ValidatedRequest,
) -> Result<RunReport, PipelineError> {
    let pipeline = Pipeline::new(Arc::new(config), harness.deps());
    let logger = RunLogger::new(request.source.kind());
    pipeline.run(request, &CancelSignal::never(), &logger).await
}

fn source_store() -> MemoryStore {
    MemoryStore::default().with_object(SOURCE_BUCKET, SOURCE_KEY)
}

#[tokio::test]
async fn test_segments_without_words_publish_uncaptioned() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), source_store(), FakeDownloader::default());
    let request = s3_request(json!({
        "segments": [{"start": 0, "end": 5}, {"start": 10, "end": 12}]
    }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    let durations: Vec<f64> = report.results.iter().map(|r| r.duration).collect();
    assert_eq!(durations, vec![5.0, 2.0]);
    assert_eq!(
        report.results[0].url,
        "https://store.test/shortconsottotitoli/segment_0_ep1.mp4"
    );
    assert!(report.failures.is_empty());
    assert!(harness.transcoder.burns().is_empty());
    assert_eq!(
        harness.store.keys_in(OUTPUT_BUCKET),
        vec!["segment_0_ep1.mp4", "segment_1_ep1.mp4"]
    );

    // Downloaded once up front, then every cut reads the local copy.
    assert_eq!(harness.store.downloads.load(Ordering::SeqCst), 1);
    assert!(harness
        .transcoder
        .cuts()
        .iter()
        .all(|c| matches!(c.input, MediaInput::File(_))));

    for listing in harness.store.scratch_at_upload.lock().unwrap().iter() {
        assert!(listing.iter().all(|name| !name.ends_with(".srt") && !name.ends_with(".ass")));
    }
}

#[tokio::test]
async fn test_highlight_captions_mark_keyword_only() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), source_store(), FakeDownloader::default());
    let request = s3_request(json!({
        "segments": [{"start": 0, "end": 1}],
        "words": [
            {"text": "Roma", "start": 0, "end": 400},
            {"text": "bella", "start": 400, "end": 900}
        ],
        "keywords": ["roma"],
        "caption_style": "highlight"
    }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();
    assert_eq!(report.results.len(), 1);

    let burns = harness.transcoder.burns();
    assert_eq!(burns.len(), 1);
    assert_eq!(burns[0].format, CaptionFormat::Ass);

    let overlay: Vec<&str> = burns[0]
        .captions
        .lines()
        .filter(|line| line.starts_with("Dialogue: 1,"))
        .collect();
    assert_eq!(overlay.len(), 1);
    assert!(overlay[0].contains(",Highlight,"));
    assert!(overlay[0].contains("{\\alpha&H00&}ROMA"));

    let base: Vec<&str> = burns[0]
        .captions
        .lines()
        .filter(|line| line.starts_with("Dialogue: 0,"))
        .collect();
    assert_eq!(base.len(), 1);
    assert!(base[0].contains(",Default,"));
    assert!(base[0].contains("BELLA"));
}

#[tokio::test]
async fn test_stream_cut_failure_falls_back_to_download_once() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        fail_url_cuts: true,
        ..FakeTranscoder::default()
    };
    let harness = Harness::new(transcoder, MemoryStore::default(), FakeDownloader::default());
    let request = url_request(json!({ "segments": [{"start": 3, "end": 8}] }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(harness.downloader.calls(), 1);

    let cuts = harness.transcoder.cuts();
    assert_eq!(cuts.len(), 2);
    assert!(matches!(cuts[0].input, MediaInput::Url(_)));
    assert!(matches!(cuts[1].input, MediaInput::File(_)));

    // The fallback copy is gone before the clip is published.
    let listings = harness.store.scratch_at_upload.lock().unwrap().clone();
    assert_eq!(listings.len(), 1);
    assert!(!listings[0].iter().any(|name| name.starts_with("input.")));

    assert_eq!(
        harness.store.keys_in(OUTPUT_BUCKET),
        vec!["segment_0_ep1.mp4"]
    );
}

#[tokio::test]
async fn test_stream_cut_success_skips_download() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), MemoryStore::default(), FakeDownloader::default());
    let request = url_request(json!({ "segments": [{"start": 0, "end": 2}, {"start": 4, "end": 6}] }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    assert_eq!(report.results.len(), 2);
    assert_eq!(harness.downloader.calls(), 0);
    assert!(harness
        .transcoder
        .cuts()
        .iter()
        .all(|c| c.input == MediaInput::Url("https://cdn.example.com/videos/ep1.mp4?sig=abc".to_string())));
}

#[tokio::test]
async fn test_fallback_uses_store_copy_when_url_download_fails() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        fail_url_cuts: true,
        ..FakeTranscoder::default()
    };
    let store = MemoryStore::default().with_object("videoliving", "ep1.mp4");
    let downloader = FakeDownloader {
        fail: true,
        ..FakeDownloader::default()
    };
    let harness = Harness::new(transcoder, store, downloader);
    let request = url_request(json!({ "segments": [{"start": 0, "end": 2}] }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(harness.downloader.calls(), 1);
    assert_eq!(harness.store.downloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_store_copy_of_path_style_url_is_found_by_file_name() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        fail_url_cuts: true,
        ..FakeTranscoder::default()
    };
    let store = MemoryStore::default().with_object("videoliving", "ep1.mp4");
    let downloader = FakeDownloader {
        fail: true,
        ..FakeDownloader::default()
    };
    let harness = Harness::new(transcoder, store, downloader);
    let request = validate(json!({
        "video_url": "https://acct.r2.cloudflarestorage.com/videoliving/ep1.mp4",
        "segments": [{"start": 0, "end": 2}]
    }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(harness.store.downloads.load(Ordering::SeqCst), 1);
    assert!(harness.store.has_object(OUTPUT_BUCKET, "segment_0_ep1.mp4"));
}

#[tokio::test]
async fn test_stream_cut_timeout_falls_back_to_download() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        timeout_url_cuts: true,
        ..FakeTranscoder::default()
    };
    let harness = Harness::new(transcoder, MemoryStore::default(), FakeDownloader::default());
    let request = url_request(json!({ "segments": [{"start": 0, "end": 2}] }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(harness.downloader.calls(), 1);
    let cuts = harness.transcoder.cuts();
    assert!(matches!(cuts[0].input, MediaInput::Url(_)));
    assert!(matches!(cuts[1].input, MediaInput::File(_)));
}

#[tokio::test]
async fn test_stream_cut_timeout_with_failed_download_is_fatal() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        timeout_url_cuts: true,
        ..FakeTranscoder::default()
    };
    let downloader = FakeDownloader {
        fail: true,
        ..FakeDownloader::default()
    };
    let harness = Harness::new(transcoder, MemoryStore::default(), downloader);
    let request = url_request(json!({ "segments": [{"start": 0, "end": 2}] }));

    let err = run(&harness, test_config(scratch.path()), &request)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Fetch { .. }));
    assert_eq!(harness.downloader.calls(), 1);
}

#[tokio::test]
async fn test_exhausted_fallback_is_fatal() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        fail_url_cuts: true,
        ..FakeTranscoder::default()
    };
    let downloader = FakeDownloader {
        fail: true,
        ..FakeDownloader::default()
    };
    let harness = Harness::new(transcoder, MemoryStore::default(), downloader);
    let request = url_request(json!({ "segments": [{"start": 0, "end": 2}, {"start": 4, "end": 6}] }));

    let err = run(&harness, test_config(scratch.path()), &request)
        .await
        .unwrap_err();

    match err {
        PipelineError::Fetch { location, message } => {
            assert_eq!(
                location,
                FetchLocation::Url("https://cdn.example.com/videos/ep1.mp4?sig=abc".to_string())
            );
            assert!(message.contains("503"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    // The run stopped at the first segment.
    assert_eq!(harness.downloader.calls(), 1);
    assert!(harness.store.keys_in(OUTPUT_BUCKET).is_empty());
}

#[tokio::test]
async fn test_failed_segment_does_not_abort_the_run() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        fail_cut_outputs: HashSet::from(["segment_1.mp4".to_string()]),
        ..FakeTranscoder::default()
    };
    let harness = Harness::new(transcoder, source_store(), FakeDownloader::default());
    let request = s3_request(json!({
        "segments": [{"start": 0, "end": 1}, {"start": 2, "end": 3}, {"start": 4, "end": 5}]
    }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    let indices: Vec<usize> = report.results.iter().map(|r| r.segment).collect();
    assert_eq!(indices, vec![0, 2]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].stage, SegmentStage::Cut);
    assert!(report.failures[0].error.contains("Invalid data found"));

    let response = report.into_response();
    assert!(response.success);
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.failures[0].stage, "cut");
}

#[tokio::test]
async fn test_publish_failure_is_segment_local() {
    let scratch = tempfile::tempdir().unwrap();
    let store = source_store().failing_upload("segment_1_ep1.mp4");
    let harness = Harness::new(FakeTranscoder::default(), store, FakeDownloader::default());
    let request = s3_request(json!({
        "segments": [{"start": 0, "end": 1}, {"start": 2, "end": 3}, {"start": 4, "end": 5}]
    }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    let indices: Vec<usize> = report.results.iter().map(|r| r.segment).collect();
    assert_eq!(indices, vec![0, 2]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].stage, SegmentStage::Publish);
    assert!(report.failures[0].error.contains("segment_1_ep1.mp4"));
    assert_eq!(
        harness.store.keys_in(OUTPUT_BUCKET),
        vec!["segment_0_ep1.mp4", "segment_2_ep1.mp4"]
    );

    let response = report.into_response();
    assert_eq!(response.failures[0].stage, "publish");
}

#[tokio::test]
async fn test_every_segment_failing_fails_the_run() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        fail_cut_outputs: HashSet::from(["segment_0.mp4".to_string(), "segment_1.mp4".to_string()]),
        ..FakeTranscoder::default()
    };
    let harness = Harness::new(transcoder, source_store(), FakeDownloader::default());
    let request = s3_request(json!({
        "segments": [{"start": 0, "end": 1}, {"start": 2, "end": 3}]
    }));

    let err = run(&harness, test_config(scratch.path()), &request)
        .await
        .unwrap_err();

    match err {
        PipelineError::AllSegmentsFailed { failures } => assert_eq!(failures.len(), 2),
        other => panic!("expected all segments failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_object_fails_before_transfer() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), MemoryStore::default(), FakeDownloader::default());
    let request = s3_request(json!({ "segments": [{"start": 0, "end": 1}] }));

    let err = run(&harness, test_config(scratch.path()), &request)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "not_found");
    match &err {
        PipelineError::Resolution { bucket, key, source } => {
            assert_eq!(bucket, SOURCE_BUCKET);
            assert_eq!(key, SOURCE_KEY);
            assert_eq!(source.code(), Some("NoSuchKey"));
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
    assert_eq!(harness.store.downloads.load(Ordering::SeqCst), 0);
    assert!(harness.transcoder.cuts().is_empty());
}

#[tokio::test]
async fn test_url_source_requires_default_store() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), MemoryStore::default(), FakeDownloader::default());
    let request = url_request(json!({ "segments": [{"start": 0, "end": 1}] }));
    let config = PipelineConfig {
        work_dir: Some(scratch.path().to_path_buf()),
        ..PipelineConfig::default()
    };

    let err = run(&harness, config, &request).await.unwrap_err();

    assert!(matches!(err, PipelineError::Config(_)));
    assert_eq!(err.to_string(), "Configuration error: S3 client not configured");
}

#[tokio::test]
async fn test_single_segment_selection_uses_output_index() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), source_store(), FakeDownloader::default());
    let request = s3_request(json!({
        "segments": [{"start": 0, "end": 1}, {"start": 2, "end": 4.5}],
        "segment_index": 1,
        "output_index": 7,
        "output_bucket": "custom-out"
    }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].segment, 7);
    assert_eq!(report.results[0].duration, 2.5);
    assert_eq!(harness.transcoder.cuts().len(), 1);
    assert_eq!(harness.store.keys_in("custom-out"), vec!["segment_7_ep1.mp4"]);
}

#[tokio::test]
async fn test_burn_failure_publishes_uncaptioned_cut() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        fail_burn: true,
        ..FakeTranscoder::default()
    };
    let harness = Harness::new(transcoder, source_store(), FakeDownloader::default());
    let request = s3_request(json!({
        "segments": [{"start": 0, "end": 1}],
        "words": [{"text": "ciao", "start": 100, "end": 500}]
    }));

    let report = run(&harness, test_config(scratch.path()), &request).await.unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(report.failures.is_empty());
    assert_eq!(harness.transcoder.burns().len(), 1);
    assert!(harness.store.has_object(OUTPUT_BUCKET, "segment_0_ep1.mp4"));
}

#[tokio::test]
async fn test_prerendered_subtitles_are_burned_as_is() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), source_store(), FakeDownloader::default());
    let srt = "1\n00:00:00,000 --> 00:00:01,000\nCiao a tutti\n";
    let request = s3_request(json!({
        "segments": [{"start": 0, "end": 1}, {"start": 5, "end": 6}],
        "words": [{"text": "ignored", "start": 0, "end": 500}],
        "subtitles": [{"segment_index": 0, "subtitle_srt": srt}]
    }));

    run(&harness, test_config(scratch.path()), &request).await.unwrap();

    // Segment 0 uses the supplied document, segment 1 has no words in window.
    let burns = harness.transcoder.burns();
    assert_eq!(burns.len(), 1);
    assert_eq!(burns[0].format, CaptionFormat::Srt);
    assert_eq!(burns[0].captions, srt);
}

#[tokio::test]
async fn test_start_offset_shifts_captions_when_enabled() {
    let scratch = tempfile::tempdir().unwrap();
    let transcoder = FakeTranscoder {
        start_offset: 1.5,
        ..FakeTranscoder::default()
    };
    let harness = Harness::new(transcoder, source_store(), FakeDownloader::default());
    let request = s3_request(json!({
        "segments": [{"start": 10, "end": 12}],
        "words": [{"text": "ciao", "start": 10000, "end": 10500}],
        "caption_style": "srt"
    }));
    let config = PipelineConfig {
        pts_correction: true,
        ..test_config(scratch.path())
    };

    run(&harness, config, &request).await.unwrap();

    let burns = harness.transcoder.burns();
    assert_eq!(burns.len(), 1);
    assert!(burns[0].captions.contains("00:00:01,500 --> 00:00:02,000"));
}

#[tokio::test]
async fn test_public_base_url_names_results() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), source_store(), FakeDownloader::default());
    let request = s3_request(json!({ "segments": [{"start": 0, "end": 1}] }));
    let config = PipelineConfig {
        public_base_url: Some("https://clips.example.com".to_string()),
        ..test_config(scratch.path())
    };

    let report = run(&harness, config, &request).await.unwrap();

    assert_eq!(report.results[0].url, "https://clips.example.com/segment_0_ep1.mp4");
}

#[tokio::test]
async fn test_cancelled_run_stops_and_cleans_up() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), source_store(), FakeDownloader::default());
    let request = s3_request(json!({ "segments": [{"start": 0, "end": 1}] }));

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let pipeline = Pipeline::new(Arc::new(test_config(scratch.path())), harness.deps());
    let err = pipeline
        .run(&request, &CancelSignal::new(rx), &RunLogger::new("object_store"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert!(harness.transcoder.cuts().is_empty());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_workspace_removed_after_run() {
    let scratch = tempfile::tempdir().unwrap();
    let harness = Harness::new(FakeTranscoder::default(), source_store(), FakeDownloader::default());
    let request = s3_request(json!({ "segments": [{"start": 0, "end": 1}] }));

    run(&harness, test_config(scratch.path()), &request).await.unwrap();

    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

    // The per-request store was built from the request's own credentials.
    let connected = harness.provider.connected.lock().unwrap().clone();
    assert_eq!(connected[0].endpoint_url, "https://acct.r2.cloudflarestorage.com");
    assert_eq!(connected[0].region, "us-east-1");
}
