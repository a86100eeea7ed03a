//! S3-compatible (Cloudflare R2) object store client.
//!
//! This crate provides:
//! - Per-run store configuration with region normalization
//! - HEAD existence checks that keep the store's error code and message
//! - Streaming download to a file and file upload
//! - The `ObjectStore` / `StoreProvider` seams the pipeline is built on

pub mod client;
pub mod error;

pub use client::{
    encode_key, object_url, ObjectMetadata, ObjectStore, R2Client, R2StoreProvider, StoreConfig,
    StoreProvider,
};
pub use error::{StorageError, StorageResult};
