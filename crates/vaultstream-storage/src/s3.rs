use async_trait::async_trait;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{Error as ObjectStoreError, ObjectStore, PutPayload, WriteMultipart};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;
use vaultstream_core::StorageBackend;

use crate::traits::{validate_key, ByteStream, Storage, StorageError, StorageResult};

const STREAM_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// S3-compatible storage implementation
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    staging_dir: PathBuf,
}

impl S3Storage {
    /// # Arguments
    /// * `bucket` - bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - custom endpoint for S3-compatible providers
    ///   (e.g. "http://localhost:9000" for MinIO)
    /// * `staging_dir` - scratch directory for `resolve` staging copies
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        staging_dir: PathBuf,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        tokio::fs::create_dir_all(&staging_dir).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create staging directory {}: {}",
                staging_dir.display(),
                e
            ))
        })?;

        Ok(S3Storage {
            store,
            bucket,
            staging_dir,
        })
    }

    fn location(key: &str) -> StorageResult<ObjectPath> {
        validate_key(key)?;
        Ok(ObjectPath::from(key))
    }

    async fn multipart_from_reader(
        &self,
        key: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let location = Self::location(key)?;

        let upload = self.store.put_multipart(&location).await.map_err(|e| {
            tracing::error!(bucket = %self.bucket, key = %key, error = %e, "S3 multipart start failed");
            StorageError::UploadFailed(e.to_string())
        })?;
        let mut writer = WriteMultipart::new(upload);

        let mut total: u64 = 0;
        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await.map_err(|e| {
                StorageError::UploadFailed(format!("Failed to read from stream: {}", e))
            })?;
            if n == 0 {
                break;
            }
            total += n as u64;
            writer
                .wait_for_capacity(8)
                .await
                .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
            writer.write(&buf[..n]);
        }

        writer.finish().await.map_err(|e| {
            tracing::error!(bucket = %self.bucket, key = %key, error = %e, "S3 multipart finish failed");
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::debug!(bucket = %self.bucket, key = %key, size_bytes = total, "S3 stream upload successful");

        Ok(total)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let location = Self::location(key)?;
        let size = data.len();

        self.store
            .put(&location, PutPayload::from(data))
            .await
            .map_err(|e| {
                tracing::error!(bucket = %self.bucket, key = %key, size_bytes = size, error = %e, "S3 upload failed");
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::debug!(bucket = %self.bucket, key = %key, size_bytes = size, "S3 upload successful");

        Ok(())
    }

    async fn upload_stream(
        &self,
        key: &str,
        _content_type: &str,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        self.multipart_from_reader(key, reader).await
    }

    async fn upload_file(&self, src: &Path, key: &str, content_type: &str) -> StorageResult<()> {
        let file = tokio::fs::File::open(src).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to open {}: {}", src.display(), e))
        })?;

        self.upload_stream(key, content_type, Box::pin(file)).await?;

        tokio::fs::remove_file(src).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to remove source {} after upload: {}",
                src.display(),
                e
            ))
        })?;

        Ok(())
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        let location = Self::location(key)?;

        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(bucket = %self.bucket, key = %key, error = %other, "S3 download failed");
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let location = Self::location(key)?;

        let result = self.store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        let bucket = self.bucket.clone();
        let key = key.to_string();
        let stream = result.into_stream().map(move |res| {
            res.map_err(|e| {
                tracing::error!(bucket = %bucket, key = %key, error = %e, "S3 stream download error");
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let location = Self::location(key)?;

        match self.store.delete(&location).await {
            Ok(()) => Ok(()),
            Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(bucket = %self.bucket, key = %key, error = %e, "S3 delete failed");
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let location = Self::location(prefix)?;

        let mut entries = self.store.list(Some(&location));
        while let Some(meta) = entries.next().await {
            let meta = match meta {
                Ok(meta) => meta,
                Err(ObjectStoreError::NotFound { .. }) => continue,
                Err(e) => return Err(StorageError::DeleteFailed(e.to_string())),
            };
            match self.store.delete(&meta.location).await {
                Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::error!(bucket = %self.bucket, key = %meta.location, error = %e, "S3 delete_prefix entry failed");
                    return Err(StorageError::DeleteFailed(e.to_string()));
                }
            }
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = Self::location(key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    /// Stages a streamed copy of the object into the scratch directory and
    /// returns its path. The caller owns the staged file's lifetime.
    async fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let mut stream = self.download_stream(key).await?;

        let basename = key.rsplit('/').next().unwrap_or("blob");
        let staged = self
            .staging_dir
            .join(format!("{}-{}", Uuid::new_v4(), basename));

        let mut file = tokio::fs::File::create(&staged).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to create staging file {}: {}",
                staged.display(),
                e
            ))
        })?;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&staged).await;
                    return Err(e);
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = tokio::fs::remove_file(&staged).await;
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to write staging file {}: {}",
                    staged.display(),
                    e
                )));
            }
        }

        file.sync_all().await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to sync staging file {}: {}",
                staged.display(),
                e
            ))
        })?;

        tracing::debug!(key = %key, staged = %staged.display(), "Staged S3 object for local access");

        Ok(staged)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
