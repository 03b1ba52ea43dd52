//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Rate limited by backend: {0}")]
    RateLimited(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether this error is the backend throttling us ("SlowDown" / 503),
    /// which the replicated client answers with a bounded backoff and retry.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, StorageError::RateLimited(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Summary of one stored object, as returned by `list`.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSummary {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "LastModified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage abstraction trait
///
/// All storage backends (S3-compatible Spaces, in-memory) implement this trait
/// so the pipeline and the passthrough endpoint never couple to one backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write one object. Writes are idempotent: re-putting identical
    /// (key, bytes) yields the same stored object.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        cache_control: &str,
    ) -> StorageResult<()>;

    /// Read one object's bytes.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Size in bytes of an object, if it exists.
    async fn head(&self, key: &str) -> StorageResult<u64>;

    /// Delete one object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Server-side copy between keys.
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// List objects under a prefix.
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<ObjectSummary>>;

    /// Bucket this backend writes to.
    fn bucket(&self) -> &str;
}
