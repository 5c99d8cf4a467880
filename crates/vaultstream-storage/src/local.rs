use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use vaultstream_core::StorageBackend;

use crate::traits::{validate_key, ByteStream, Storage, StorageError, StorageResult};

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// # Arguments
    /// * `base_path` - Root directory for blob storage (e.g. "/var/lib/vaultstream/media")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let base_path = base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        Ok(LocalStorage { base_path })
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Streamed copy used when rename crosses filesystems. Removes the
    /// partially written destination on error.
    async fn copy_into(&self, src: &Path, dest: &Path) -> StorageResult<u64> {
        let mut reader = fs::File::open(src).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to open {}: {}", src.display(), e))
        })?;
        let mut writer = fs::File::create(dest).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create {}: {}", dest.display(), e))
        })?;

        let copied = match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(n) => n,
            Err(e) => {
                drop(writer);
                let _ = fs::remove_file(dest).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to copy into {}: {}",
                    dest.display(),
                    e
                )));
            }
        };

        if let Err(e) = writer.sync_all().await {
            let _ = fs::remove_file(dest).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to sync {}: {}",
                dest.display(),
                e
            )));
        }

        Ok(copied)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            tracing::error!(path = %path.display(), key = %key, error = %e, "Local storage upload create failed");
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            tracing::error!(path = %path.display(), key = %key, error = %e, "Local storage upload write failed");
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %key, size_bytes = size, "Local storage upload successful");

        Ok(())
    }

    async fn upload_stream(
        &self,
        key: &str,
        _content_type: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            tracing::error!(path = %path.display(), key = %key, error = %e, "Local storage stream upload create failed");
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = match tokio::io::copy(&mut reader, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&path).await;
                tracing::error!(path = %path.display(), key = %key, error = %e, "Local storage stream upload write failed");
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %key, size_bytes = bytes_copied, "Local storage stream upload successful");

        Ok(bytes_copied)
    }

    async fn upload_file(&self, src: &Path, key: &str, _content_type: &str) -> StorageResult<()> {
        let dest = self.key_to_path(key)?;
        self.ensure_parent_dir(&dest).await?;

        // Same-device moves are a rename; anything else falls back to a
        // streamed copy plus source delete.
        match fs::rename(src, &dest).await {
            Ok(()) => {
                tracing::debug!(key = %key, src = %src.display(), "Local storage move via rename");
                Ok(())
            }
            Err(rename_err) => {
                tracing::debug!(
                    key = %key,
                    src = %src.display(),
                    error = %rename_err,
                    "Rename failed, falling back to streamed copy"
                );
                self.copy_into(src, &dest).await?;
                fs::remove_file(src).await.map_err(|e| {
                    StorageError::UploadFailed(format!(
                        "Failed to remove source {} after copy: {}",
                        src.display(),
                        e
                    ))
                })?;
                Ok(())
            }
        }
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            tracing::error!(path = %path.display(), key = %key, error = %e, "Local storage download read failed");
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Ok(data)
    }

    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            tracing::error!(path = %path.display(), key = %key, error = %e, "Local storage stream download open failed");
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let key = key.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Local storage stream download error");
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            tracing::error!(path = %path.display(), key = %key, error = %e, "Local storage delete failed");
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let path = self.key_to_path(prefix)?;

        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::error!(path = %path.display(), prefix = %prefix, error = %e, "Local storage delete_prefix failed");
                Err(StorageError::DeleteFailed(format!(
                    "Failed to delete directory {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let path = self.key_to_path(key)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(path)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
