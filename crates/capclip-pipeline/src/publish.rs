//! Publishing rendered clips.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use capclip_models::basename;
use capclip_storage::{encode_key, object_url, ObjectStore, StorageResult};

use crate::metrics;
use crate::source::OutputTarget;

const CLIP_CONTENT_TYPE: &str = "video/mp4";

/// Output key of a published segment: `segment_{index}_{basename(source)}`.
pub fn output_key(index: usize, source_key: &str) -> String {
    format!("segment_{}_{}", index, basename(source_key))
}

/// Uploads clips to the output bucket and derives their URLs.
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    public_base_url: Option<String>,
}

impl Publisher {
    pub fn new(target: &OutputTarget, public_base_url: Option<String>) -> Self {
        Self {
            store: Arc::clone(&target.store),
            bucket: target.bucket.clone(),
            public_base_url,
        }
    }

    /// Upload `path` to `key`, overwriting any previous object, and return its URL.
    pub async fn publish(&self, path: &Path, key: &str) -> StorageResult<String> {
        let started = Instant::now();
        self.store
            .upload_file(&self.bucket, key, path, CLIP_CONTENT_TYPE)
            .await?;
        metrics::record_upload_duration(started.elapsed().as_secs_f64());

        let url = self.url_for(key);
        info!(bucket = %self.bucket, key = %key, url = %url, "Published clip");
        Ok(url)
    }

    /// Public URL of `key`: the configured base when set, else path-style on the store.
    pub fn url_for(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), encode_key(key)),
            None => object_url(self.store.endpoint(), &self.bucket, key),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}
