//! R2 client implementation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use capclip_models::{normalize_region, ObjectStoreSource};

use crate::error::{StorageError, StorageResult};

/// Connection settings for one S3-compatible store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Concrete signing region (never `auto`)
    pub region: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl StoreConfig {
    pub fn new(
        endpoint_url: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: Option<&str>,
    ) -> StorageResult<Self> {
        let endpoint_url = endpoint_url.into().trim().trim_end_matches('/').to_string();
        if endpoint_url.is_empty() {
            return Err(StorageError::config_error("endpoint URL is empty"));
        }
        Ok(Self {
            endpoint_url,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: normalize_region(region),
        })
    }

    /// Settings for the store an object-store source points at.
    pub fn from_source(source: &ObjectStoreSource) -> StorageResult<Self> {
        Self::new(
            source.endpoint.as_str(),
            source.credentials.access_key_id.as_str(),
            source.credentials.secret_access_key.as_str(),
            Some(source.region.as_str()),
        )
    }
}

/// Metadata returned by a HEAD request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

/// The object-store operations the pipeline needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Existence check; fails with `NotFound` / `AccessDenied` precisely.
    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata>;

    /// Stream an object to a local file, returning the bytes written.
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<u64>;

    /// Upload a local file, overwriting any existing object at `key`.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Endpoint the store is reached at.
    fn endpoint(&self) -> &str;
}

/// Builds store clients from per-run settings.
pub trait StoreProvider: Send + Sync {
    fn connect(&self, config: &StoreConfig) -> StorageResult<Arc<dyn ObjectStore>>;
}

/// Cloudflare R2 (or any S3-compatible) storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    endpoint: String,
}

impl R2Client {
    /// Create a path-style client from configuration.
    pub fn new(config: &StoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            endpoint: config.endpoint_url.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMetadata> {
        debug!("HEAD {}/{}", bucket, key);

        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                StorageError::classify(
                    bucket,
                    key,
                    e.raw_response().map(|r| r.status().as_u16()),
                    e.code(),
                    e.message(),
                    StorageError::AwsSdk,
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        Ok(ObjectMetadata {
            content_length: response.content_length().and_then(|n| u64::try_from(n).ok()),
            content_type: response.content_type().map(str::to_string),
        })
    }

    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<u64> {
        debug!("Downloading {}/{} to {}", bucket, key, path.display());

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                StorageError::classify(
                    bucket,
                    key,
                    e.raw_response().map(|r| r.status().as_u16()),
                    e.code(),
                    e.message(),
                    StorageError::download_failed,
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut body = response.body;
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!("Downloaded {}/{} to {} ({} bytes)", bucket, key, path.display(), written);
        Ok(written)
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} to {}/{}", path.display(), bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                StorageError::classify(
                    bucket,
                    key,
                    e.raw_response().map(|r| r.status().as_u16()),
                    e.code(),
                    e.message(),
                    StorageError::upload_failed,
                    DisplayErrorContext(&e).to_string(),
                )
            })?;

        info!("Uploaded {} to {}/{}", path.display(), bucket, key);
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// [`StoreProvider`] that builds [`R2Client`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct R2StoreProvider;

impl StoreProvider for R2StoreProvider {
    fn connect(&self, config: &StoreConfig) -> StorageResult<Arc<dyn ObjectStore>> {
        Ok(Arc::new(R2Client::new(config)))
    }
}

/// Path-style URL of an object: `{endpoint}/{bucket}/{key}` with the key
/// percent-encoded per path segment.
pub fn object_url(endpoint: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        endpoint.trim_end_matches('/'),
        bucket,
        encode_key(key)
    )
}

/// Percent-encode each `/`-separated segment of an object key.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
