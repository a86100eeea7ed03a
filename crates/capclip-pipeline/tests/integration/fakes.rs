//! In-memory stand-ins for the pipeline's external collaborators.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use capclip_media::{CaptionFile, CaptionFormat, MediaError, MediaInput, MediaResult, Transcoder};
use capclip_models::Segment;
use capclip_pipeline::{
    DefaultStore, DownloadError, PipelineConfig, PipelineDeps, SourceDownloader,
};
use capclip_storage::{
    ObjectMetadata, ObjectStore, StorageError, StorageResult, StoreConfig, StoreProvider,
};

pub const STORE_ENDPOINT: &str = "https://store.test";

/// A recorded cut invocation.
#[derive(Debug, Clone)]
pub struct CutCall {
    pub input: MediaInput,
    pub output: PathBuf,
}

/// A recorded burn invocation, with the caption document as it was on disk.
#[derive(Debug, Clone)]
pub struct BurnCall {
    pub format: CaptionFormat,
    pub captions: String,
}

/// Transcoder that writes placeholder files instead of running ffmpeg.
#[derive(Default)]
pub struct FakeTranscoder {
    /// Output file names (e.g. `segment_1.mp4`) whose cut fails
    pub fail_cut_outputs: HashSet<String>,
    /// Fail every cut that reads a URL
    pub fail_url_cuts: bool,
    /// Time out every cut that reads a URL
    pub timeout_url_cuts: bool,
    pub fail_burn: bool,
    pub start_offset: f64,
    pub cuts: Mutex<Vec<CutCall>>,
    pub burns: Mutex<Vec<BurnCall>>,
}

impl FakeTranscoder {
    pub fn cuts(&self) -> Vec<CutCall> {
        self.cuts.lock().unwrap().clone()
    }

    pub fn burns(&self) -> Vec<BurnCall> {
        self.burns.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn cut(&self, input: &MediaInput, _segment: &Segment, output: &Path) -> MediaResult<()> {
        self.cuts.lock().unwrap().push(CutCall {
            input: input.clone(),
            output: output.to_path_buf(),
        });

        if let MediaInput::File(path) = input {
            if !path.exists() {
                return Err(MediaError::FileNotFound(path.clone()));
            }
        }

        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let remote = matches!(input, MediaInput::Url(_));
        if remote && self.timeout_url_cuts {
            return Err(MediaError::Timeout(600));
        }
        if self.fail_cut_outputs.contains(&name) || (remote && self.fail_url_cuts) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with status 1",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            ));
        }

        tokio::fs::write(output, b"cut").await?;
        Ok(())
    }

    async fn burn(&self, input: &Path, captions: &CaptionFile, output: &Path) -> MediaResult<()> {
        let contents = tokio::fs::read_to_string(&captions.path).await?;
        self.burns.lock().unwrap().push(BurnCall {
            format: captions.format,
            captions: contents,
        });

        if self.fail_burn {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with status 1",
                Some("Unable to open subtitles".to_string()),
                Some(1),
            ));
        }

        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn probe_start_time(&self, _input: &Path) -> MediaResult<f64> {
        Ok(self.start_offset)
    }
}

/// Object store over a hash map.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    /// Scratch directory contents seen at each upload
    pub scratch_at_upload: Mutex<Vec<Vec<String>>>,
    pub downloads: AtomicUsize,
    /// Output keys whose upload is rejected
    fail_upload_keys: HashSet<String>,
}

impl MemoryStore {
    pub fn with_object(self, bucket: &str, key: &str) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), b"source".to_vec());
        self
    }

    pub fn failing_upload(mut self, key: &str) -> Self {
        self.fail_upload_keys.insert(key.to_string());
        self
    }

    pub fn has_object(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn keys_in(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        let objects = self.objects.lock().unwrap();
        match objects.get(&(bucket.to_string(), key.to_string())) {
            Some(bytes) => Ok(ObjectMetadata {
                content_length: Some(bytes.len() as u64),
                content_type: Some("video/mp4".to_string()),
            }),
            None => Err(StorageError::not_found(
                bucket,
                key,
                "NoSuchKey",
                "The specified key does not exist.",
            )),
        }
    }

    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<u64> {
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(bucket, key, "NoSuchKey", "missing"))?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(path, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        _content_type: &str,
    ) -> StorageResult<()> {
        if self.fail_upload_keys.contains(key) {
            return Err(StorageError::upload_failed("503 Service Unavailable"));
        }

        if let Some(parent) = path.parent() {
            let mut names: Vec<String> = std::fs::read_dir(parent)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .collect();
            names.sort();
            self.scratch_at_upload.lock().unwrap().push(names);
        }

        let bytes = tokio::fs::read(path).await?;
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes);
        Ok(())
    }

    fn endpoint(&self) -> &str {
        STORE_ENDPOINT
    }
}

/// Hands out the same in-memory store for every configuration.
pub struct FakeProvider {
    pub store: Arc<MemoryStore>,
    pub connected: Mutex<Vec<StoreConfig>>,
}

impl FakeProvider {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            connected: Mutex::new(Vec::new()),
        }
    }
}

impl StoreProvider for FakeProvider {
    fn connect(&self, config: &StoreConfig) -> StorageResult<Arc<dyn ObjectStore>> {
        self.connected.lock().unwrap().push(config.clone());
        Ok(self.store.clone() as Arc<dyn ObjectStore>)
    }
}

/// Downloader that writes a fixed body, or fails.
#[derive(Default)]
pub struct FakeDownloader {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeDownloader {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceDownloader for FakeDownloader {
    async fn download(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DownloadError::Status {
                status: 503,
                url: url.to_string(),
            });
        }
        tokio::fs::write(path, b"downloaded").await?;
        Ok(10)
    }
}

/// Collaborators of one test run, kept around for assertions.
pub struct Harness {
    pub transcoder: Arc<FakeTranscoder>,
    pub store: Arc<MemoryStore>,
    pub provider: Arc<FakeProvider>,
    pub downloader: Arc<FakeDownloader>,
}

impl Harness {
    pub fn new(transcoder: FakeTranscoder, store: MemoryStore, downloader: FakeDownloader) -> Self {
        let store = Arc::new(store);
        Self {
            transcoder: Arc::new(transcoder),
            provider: Arc::new(FakeProvider::new(store.clone())),
            store,
            downloader: Arc::new(downloader),
        }
    }

    pub fn deps(&self) -> PipelineDeps {
        PipelineDeps {
            transcoder: self.transcoder.clone(),
            stores: self.provider.clone(),
            downloader: self.downloader.clone(),
        }
    }
}

/// Configuration with a default store and scratch under `work_dir`.
pub fn test_config(work_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        work_dir: Some(work_dir.to_path_buf()),
        default_store: Some(DefaultStore {
            config: StoreConfig::new(STORE_ENDPOINT, "default-id", "default-secret", None).unwrap(),
            input_bucket: "videoliving".to_string(),
            output_bucket: "shortconsottotitoli".to_string(),
        }),
        ..PipelineConfig::default()
    }
}
