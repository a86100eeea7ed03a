//! Source resolution: which store and bucket the bytes come from and go to.

use std::sync::Arc;

use tracing::{debug, info};

use capclip_models::{basename, ClipSource, ValidatedRequest};
use capclip_storage::{ObjectStore, StoreConfig, StoreProvider};

use crate::config::{PipelineConfig, DEFAULT_OUTPUT_BUCKET};
use crate::error::{PipelineError, PipelineResult};

/// An object in a specific store.
#[derive(Clone)]
pub struct StoreObject {
    pub store: Arc<dyn ObjectStore>,
    pub bucket: String,
    pub key: String,
}

/// Where the source bytes are read from.
#[derive(Clone)]
pub enum SourceInput {
    /// Authenticated object store; always downloaded before cutting.
    Store(StoreObject),
    /// Public URL; streamed into the cutter, downloaded only as a fallback.
    Url {
        url: String,
        /// Copy of the source in the default store's input bucket, tried
        /// when the URL itself cannot be downloaded.
        mirror: Option<StoreObject>,
    },
}

/// Where rendered clips are published.
#[derive(Clone)]
pub struct OutputTarget {
    pub store: Arc<dyn ObjectStore>,
    pub bucket: String,
}

/// A fully resolved run source.
#[derive(Clone)]
pub struct ResolvedSource {
    pub input: SourceInput,
    pub output: OutputTarget,
    /// Source object key; its basename names the outputs
    pub source_key: String,
}

/// Resolves a validated request against configuration and store clients.
pub struct MediaSource<'a> {
    config: &'a PipelineConfig,
    stores: &'a dyn StoreProvider,
}

impl<'a> MediaSource<'a> {
    pub fn new(config: &'a PipelineConfig, stores: &'a dyn StoreProvider) -> Self {
        Self { config, stores }
    }

    /// Build store clients and pick input/output locations.
    ///
    /// A public-URL source publishes to the default store, so it fails with a
    /// configuration error when none is configured.
    pub fn resolve(&self, request: &ValidatedRequest) -> PipelineResult<ResolvedSource> {
        match &request.source {
            ClipSource::ObjectStore(source) => {
                let config = StoreConfig::from_source(source)
                    .map_err(|e| PipelineError::config(e.to_string()))?;
                let store = self
                    .stores
                    .connect(&config)
                    .map_err(|e| PipelineError::config(e.to_string()))?;

                let output_bucket = request
                    .output_bucket
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OUTPUT_BUCKET.to_string());

                debug!(
                    bucket = %source.bucket,
                    key = %source.key,
                    output_bucket = %output_bucket,
                    "Resolved object-store source"
                );

                Ok(ResolvedSource {
                    input: SourceInput::Store(StoreObject {
                        store: Arc::clone(&store),
                        bucket: source.bucket.clone(),
                        key: source.key.clone(),
                    }),
                    output: OutputTarget {
                        store,
                        bucket: output_bucket,
                    },
                    source_key: source.key.clone(),
                })
            }
            ClipSource::PublicUrl(source) => {
                let default_store = self
                    .config
                    .default_store
                    .as_ref()
                    .ok_or_else(|| PipelineError::config("S3 client not configured"))?;
                let store = self
                    .stores
                    .connect(&default_store.config)
                    .map_err(|e| PipelineError::config(e.to_string()))?;

                let output_bucket = request
                    .output_bucket
                    .clone()
                    .unwrap_or_else(|| default_store.output_bucket.clone());

                debug!(
                    url = %source.url,
                    key = %source.key,
                    output_bucket = %output_bucket,
                    "Resolved public-URL source"
                );

                Ok(ResolvedSource {
                    input: SourceInput::Url {
                        url: source.url.clone(),
                        // Uploads land in the input bucket under their file name
                        mirror: Some(StoreObject {
                            store: Arc::clone(&store),
                            bucket: default_store.input_bucket.clone(),
                            key: basename(&source.key).to_string(),
                        }),
                    },
                    output: OutputTarget {
                        store,
                        bucket: output_bucket,
                    },
                    source_key: source.key.clone(),
                })
            }
        }
    }

    /// HEAD the source object before any transfer.
    ///
    /// Only the object-store form is checked; a URL is checked lazily by the
    /// first fetch attempt.
    pub async fn existence_check(&self, resolved: &ResolvedSource) -> PipelineResult<()> {
        let SourceInput::Store(object) = &resolved.input else {
            return Ok(());
        };

        let metadata = object
            .store
            .head_object(&object.bucket, &object.key)
            .await
            .map_err(|source| PipelineError::Resolution {
                bucket: object.bucket.clone(),
                key: object.key.clone(),
                source,
            })?;

        info!(
            bucket = %object.bucket,
            key = %object.key,
            size = ?metadata.content_length,
            "Source object exists"
        );
        Ok(())
    }
}
