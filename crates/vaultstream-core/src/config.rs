//! Configuration module
//!
//! Environment-driven configuration for the VaultStream service. Values are
//! read once at startup; `validate()` enforces the production hardening
//! rules (explicit CORS origins, a real signing secret).

use std::env;
use std::path::PathBuf;

use crate::models::StorageBackend;

const DEV_SIGNING_SECRET: &str = "vaultstream-development-signing-secret-not-for-production";

const STREAM_TOKEN_TTL_SECS: u64 = 3600;
const SESSION_TOKEN_TTL_HOURS: u64 = 24;
const PASSPHRASE_TIME_COST: u32 = 3;
const MAX_UPLOAD_SIZE_MIB: usize = 2048;
const HLS_SEGMENT_DURATION: u64 = 4;
const RENDITION_TIMEOUT_SECS: u64 = 3600;
const MAX_CONCURRENT_PIPELINES: usize = 2;

/// Load a `.env` file if present. Safe to call multiple times.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,

    // Signing
    pub stream_signing_secret: String,
    pub stream_token_ttl_secs: u64,
    pub session_token_ttl_hours: u64,

    // Passphrase hashing
    pub passphrase_time_cost: u32,

    // Upload limits
    pub allowed_video_extensions: Vec<String>,
    pub max_upload_size_bytes: usize,

    // Transcoding
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub hls_segment_duration: u64,
    pub rendition_timeout_secs: u64,
    pub max_concurrent_pipelines: usize,

    // Storage
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub scratch_dir: PathBuf,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        load_dotenv();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| match s.to_lowercase().as_str() {
                "s3" => Ok(StorageBackend::S3),
                "local" => Ok(StorageBackend::Local),
                other => Err(anyhow::anyhow!(
                    "STORAGE_BACKEND must be 'local' or 's3', got '{}'",
                    other
                )),
            })
            .transpose()?
            .unwrap_or(StorageBackend::Local);

        let scratch_dir = env::var("SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("vaultstream"));

        Ok(Config {
            server_port: env::var("VAULTSTREAM_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("VAULTSTREAM_PORT must be a valid port number"))?,
            environment,
            cors_origins,
            stream_signing_secret: env::var("STREAM_SIGNING_SECRET")
                .unwrap_or_else(|_| DEV_SIGNING_SECRET.to_string()),
            stream_token_ttl_secs: env::var("STREAM_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| STREAM_TOKEN_TTL_SECS.to_string())
                .parse()
                .unwrap_or(STREAM_TOKEN_TTL_SECS),
            session_token_ttl_hours: env::var("SESSION_TOKEN_TTL_HOURS")
                .unwrap_or_else(|_| SESSION_TOKEN_TTL_HOURS.to_string())
                .parse()
                .unwrap_or(SESSION_TOKEN_TTL_HOURS),
            passphrase_time_cost: env::var("PASSPHRASE_TIME_COST")
                .unwrap_or_else(|_| PASSPHRASE_TIME_COST.to_string())
                .parse()
                .unwrap_or(PASSPHRASE_TIME_COST),
            allowed_video_extensions: env::var("ALLOWED_VIDEO_EXTENSIONS")
                .unwrap_or_else(|_| "mp4,mov,avi,mkv,webm".to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_MIB")
                .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MIB.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_UPLOAD_SIZE_MIB)
                * 1024
                * 1024,
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            hls_segment_duration: env::var("HLS_SEGMENT_DURATION")
                .unwrap_or_else(|_| HLS_SEGMENT_DURATION.to_string())
                .parse()
                .unwrap_or(HLS_SEGMENT_DURATION),
            rendition_timeout_secs: env::var("RENDITION_TIMEOUT_SECS")
                .unwrap_or_else(|_| RENDITION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(RENDITION_TIMEOUT_SECS),
            max_concurrent_pipelines: env::var("MAX_CONCURRENT_PIPELINES")
                .unwrap_or_else(|_| MAX_CONCURRENT_PIPELINES.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_CONCURRENT_PIPELINES)
                .max(1),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            scratch_dir,
        })
    }

    /// Enforce the rules a production deployment must satisfy. Development
    /// mode accepts the built-in defaults.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() {
            if self.stream_signing_secret == DEV_SIGNING_SECRET {
                return Err(anyhow::anyhow!(
                    "STREAM_SIGNING_SECRET must be set explicitly in production"
                ));
            }
            if self.stream_signing_secret.len() < 32 {
                return Err(anyhow::anyhow!(
                    "STREAM_SIGNING_SECRET must be at least 32 bytes in production"
                ));
            }
            if self.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
        }
        if self.hls_segment_duration == 0 {
            return Err(anyhow::anyhow!("HLS_SEGMENT_DURATION must be positive"));
        }
        if self.allowed_video_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_VIDEO_EXTENSIONS must list at least one extension"
            ));
        }
        Ok(())
    }

    pub fn signing_secret_bytes(&self) -> &[u8] {
        self.stream_signing_secret.as_bytes()
    }
}

impl Default for Config {
    /// Development defaults, used by tests. Mirrors `from_env` with no
    /// environment set.
    fn default() -> Self {
        Config {
            server_port: 8080,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            stream_signing_secret: DEV_SIGNING_SECRET.to_string(),
            stream_token_ttl_secs: STREAM_TOKEN_TTL_SECS,
            session_token_ttl_hours: SESSION_TOKEN_TTL_HOURS,
            passphrase_time_cost: PASSPHRASE_TIME_COST,
            allowed_video_extensions: vec![
                "mp4".to_string(),
                "mov".to_string(),
                "avi".to_string(),
                "mkv".to_string(),
                "webm".to_string(),
            ],
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MIB * 1024 * 1024,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            hls_segment_duration: HLS_SEGMENT_DURATION,
            rendition_timeout_secs: RENDITION_TIMEOUT_SECS,
            max_concurrent_pipelines: MAX_CONCURRENT_PIPELINES,
            storage_backend: StorageBackend::Local,
            local_storage_path: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            scratch_dir: env::temp_dir().join("vaultstream"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_rejects_dev_secret() {
        let config = Config {
            environment: "production".to_string(),
            cors_origins: vec!["https://vault.example.com".to_string()],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("STREAM_SIGNING_SECRET"));
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let config = Config {
            environment: "production".to_string(),
            cors_origins: vec!["https://vault.example.com".to_string()],
            stream_signing_secret: "too-short".to_string(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_production_rejects_wildcard_cors() {
        let config = Config {
            environment: "production".to_string(),
            stream_signing_secret: "a".repeat(48),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));
    }
}
