//! Clip sources: where the source video bytes come from.

use std::fmt;

use url::Url;

use crate::error::{ModelError, ModelResult};

/// Region used when a store is configured with `auto` or no region.
///
/// SigV4 signing needs a concrete region even for endpoints that ignore it.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Access credentials for an S3-compatible store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Authenticated object-store source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreSource {
    /// S3 API endpoint URL
    pub endpoint: String,
    pub bucket: String,
    pub key: String,
    pub credentials: StoreCredentials,
    /// Normalized, never `auto`
    pub region: String,
}

/// Publicly fetchable source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrlSource {
    pub url: String,
    /// Object key derived from the URL path
    pub key: String,
}

/// Resolved origin of the source video for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipSource {
    ObjectStore(ObjectStoreSource),
    PublicUrl(PublicUrlSource),
}

impl ClipSource {
    /// Key of the source object; its basename names the published outputs.
    pub fn source_key(&self) -> &str {
        match self {
            ClipSource::ObjectStore(source) => &source.key,
            ClipSource::PublicUrl(source) => &source.key,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClipSource::ObjectStore(_) => "object_store",
            ClipSource::PublicUrl(_) => "public_url",
        }
    }
}

/// Map an unqualified `auto` or absent region to [`DEFAULT_REGION`].
pub fn normalize_region(region: Option<&str>) -> String {
    match region.map(str::trim) {
        None | Some("") => DEFAULT_REGION.to_string(),
        Some(r) if r.eq_ignore_ascii_case("auto") => DEFAULT_REGION.to_string(),
        Some(r) => r.to_string(),
    }
}

/// Derive an object key from a URL's path, percent-decoded, ignoring the query.
///
/// # Examples
/// ```
/// use capclip_models::object_key_from_url;
/// let key = object_key_from_url("https://cdn.example.com/videos/my%20clip.mp4?sig=abc").unwrap();
/// assert_eq!(key, "videos/my clip.mp4");
/// ```
pub fn object_key_from_url(raw: &str) -> ModelResult<String> {
    let url = Url::parse(raw.trim()).map_err(|e| ModelError::invalid_url(raw, e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ModelError::invalid_url(raw, "only http and https URLs are supported"));
    }

    let path = url.path().trim_start_matches('/');
    let key = urlencoding::decode(path)
        .map_err(|e| ModelError::invalid_url(raw, e.to_string()))?
        .into_owned();

    if key.is_empty() || key.ends_with('/') {
        return Err(ModelError::invalid_url(raw, "URL path does not name an object"));
    }

    Ok(key)
}

/// Final path component of an object key.
pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
