//! Application wiring: storage, repository, pipeline, signer, router.

pub mod routes;
pub mod server;

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use vaultstream_core::Config;
use vaultstream_db::{MemoryVideoRepository, VideoRepository};
use vaultstream_processing::{FfmpegTranscoder, VideoPipeline};
use vaultstream_storage::create_storage;

use crate::state::{AppState, VideoState};
use crate::token::StreamSigner;

/// Build the full application. Returns the shared state (for tests and
/// startup logging) and the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    tokio::fs::create_dir_all(&config.scratch_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create scratch directory {}",
                config.scratch_dir.display()
            )
        })?;

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;
    tracing::info!(backend = %storage.backend_type(), "Storage backend initialized");

    let repository: Arc<dyn VideoRepository> = Arc::new(MemoryVideoRepository::new());

    let transcoder = Arc::new(
        FfmpegTranscoder::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
            config.hls_segment_duration,
            Duration::from_secs(config.rendition_timeout_secs),
        )
        .context("Failed to initialize transcoder")?,
    );

    let pipeline = Arc::new(VideoPipeline::new(
        Arc::clone(&repository),
        Arc::clone(&storage),
        transcoder,
        config.max_concurrent_pipelines,
    ));

    let swept = pipeline.fail_interrupted().await;
    if swept > 0 {
        tracing::warn!(count = swept, "Marked interrupted videos as failed at startup");
    }

    let signer = StreamSigner::new(
        config.signing_secret_bytes(),
        Duration::from_secs(config.stream_token_ttl_secs),
    );

    let state = Arc::new(AppState {
        videos: VideoState {
            repository,
            storage,
            pipeline,
        },
        signer,
        config,
    });

    let router = routes::build_router(state.clone())?;

    Ok((state, router))
}
