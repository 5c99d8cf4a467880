use crate::{LocalStorage, S3Storage, Storage, StorageError, StorageResult};
use std::sync::Arc;
use vaultstream_core::{Config, StorageBackend};

const DEFAULT_LOCAL_PATH: &str = "./data/media";

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackend::Local => {
            let base_path = config
                .local_storage_path
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_PATH.to_string());

            let storage = LocalStorage::new(base_path).await?;
            Ok(Arc::new(storage))
        }

        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config
                .s3_region
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_REGION not configured".to_string()))?;
            let endpoint = config.s3_endpoint.clone();

            let storage = S3Storage::new(
                bucket,
                region,
                endpoint,
                config.scratch_dir.join("s3-staging"),
            )
            .await?;
            Ok(Arc::new(storage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstream_core::Config;

    #[tokio::test]
    async fn test_s3_backend_requires_bucket() {
        let config = Config {
            storage_backend: StorageBackend::S3,
            ..Config::default()
        };
        let err = create_storage(&config).await.err().unwrap();
        assert!(matches!(err, StorageError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_local_backend_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            local_storage_path: Some(dir.path().to_string_lossy().into_owned()),
            ..Config::default()
        };
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
    }
}
