//! Storage abstraction trait
//!
//! All storage backends (local filesystem, S3-compatible) implement this
//! trait so the pipeline and the HLS serving path stay backend-agnostic.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;
use vaultstream_core::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Lazy chunked download, used for media segments.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Reject keys that could escape the storage root. Backends call this
/// before touching any path.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty storage key".to_string()));
    }
    if key.starts_with('/') || key.split('/').any(|part| part == "..") {
        return Err(StorageError::InvalidKey(format!(
            "storage key escapes the storage root: {}",
            key
        )));
    }
    Ok(())
}

/// Blob storage abstraction.
///
/// `download` is fully buffered and reserved for small objects (playlists);
/// `download_stream` is the path for segments. `resolve` yields a local
/// filesystem path the external encoder can read - the local backend
/// returns its real path, remote backends stage a copy.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write an entire in-memory blob, creating intermediate directories.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Write a blob from an async reader without buffering it. Returns the
    /// number of bytes written.
    async fn upload_stream(
        &self,
        key: &str,
        content_type: &str,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64>;

    /// Move a local file into storage. The source file is consumed on
    /// success; a partially written destination is cleaned up on error.
    async fn upload_file(&self, src: &Path, key: &str, content_type: &str) -> StorageResult<()>;

    /// Fully-buffered read. Small objects only.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Lazy read. Fails with `NotFound` before any bytes flow; later errors
    /// surface through the stream and must be propagated by the consumer.
    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Idempotent: deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Recursively delete everything under the prefix. Idempotent.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Local filesystem path for the object, for handing to the external
    /// encoder. Remote backends stage a streamed copy into scratch space;
    /// the caller owns the returned file's lifetime in that case.
    async fn resolve(&self, key: &str) -> StorageResult<PathBuf>;

    fn backend_type(&self) -> StorageBackend;
}
