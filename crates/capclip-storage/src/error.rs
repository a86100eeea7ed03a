//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// `NotFound` and `AccessDenied` keep the store-native error code and message.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Object not found: {bucket}/{key} ({code}: {message})")]
    NotFound {
        bucket: String,
        key: String,
        code: String,
        message: String,
    },

    #[error("Access denied: {bucket}/{key} ({code}: {message})")]
    AccessDenied {
        bucket: String,
        key: String,
        code: String,
        message: String,
    },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(
        bucket: impl Into<String>,
        key: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn access_denied(
        bucket: impl Into<String>,
        key: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AccessDenied {
            bucket: bucket.into(),
            key: key.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    /// Store-native error code, when the store returned one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::NotFound { code, .. } | Self::AccessDenied { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Classify a failed store request from its HTTP status and error metadata.
    ///
    /// 404 and 403 (or their S3 codes) become `NotFound` / `AccessDenied`;
    /// everything else goes through `fallback`.
    pub fn classify(
        bucket: &str,
        key: &str,
        status: Option<u16>,
        code: Option<&str>,
        message: Option<&str>,
        fallback: impl FnOnce(String) -> StorageError,
        detail: String,
    ) -> Self {
        let message = message.unwrap_or(detail.as_str()).to_string();
        match (status, code) {
            (Some(404), _) | (_, Some("NoSuchKey" | "NotFound" | "NoSuchBucket")) => {
                Self::not_found(bucket, key, code.unwrap_or("NotFound"), message)
            }
            (Some(403), _) | (_, Some("AccessDenied" | "Forbidden" | "InvalidAccessKeyId" | "SignatureDoesNotMatch")) => {
                Self::access_denied(bucket, key, code.unwrap_or("AccessDenied"), message)
            }
            _ => fallback(detail),
        }
    }
}
