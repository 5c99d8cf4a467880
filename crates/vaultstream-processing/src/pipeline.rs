//! Video pipeline orchestration: move source into storage, probe, encode
//! the HLS ladder, upload the tree, flip the record to `ready` or `failed`.
//!
//! Each upload gets one detached task so the whole pipeline for a video is
//! serialized; distinct videos run in parallel up to the semaphore cap.
//! Every exit path leaves the record in `ready` or `failed` - never in an
//! intermediate state.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tempfile::{TempDir, TempPath};
use tokio::sync::Semaphore;
use uuid::Uuid;

use vaultstream_core::models::{Resolution, VideoStatus};
use vaultstream_core::StorageBackend;
use vaultstream_db::VideoRepository;
use vaultstream_storage::{keys, Storage};

use crate::ladder::derive_ladder;
use crate::transcoder::FfmpegTranscoder;

const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

const INTERRUPTED_ERROR: &str = "processing interrupted by service restart";

#[derive(Clone)]
pub struct VideoPipeline {
    repository: Arc<dyn VideoRepository>,
    storage: Arc<dyn Storage>,
    transcoder: Arc<FfmpegTranscoder>,
    limiter: Arc<Semaphore>,
}

impl VideoPipeline {
    pub fn new(
        repository: Arc<dyn VideoRepository>,
        storage: Arc<dyn Storage>,
        transcoder: Arc<FfmpegTranscoder>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            repository,
            storage,
            transcoder,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Fire the pipeline for an accepted upload. Runs detached from the
    /// request that triggered it; the returned handle is only used by tests.
    pub fn spawn(&self, video_id: Uuid, scratch: TempPath) -> tokio::task::JoinHandle<()> {
        let pipeline = self.clone();

        tokio::spawn(async move {
            let _permit = match pipeline.limiter.acquire().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            tracing::info!(video_id = %video_id, "Starting video processing");

            if let Err(e) = pipeline.process(video_id, scratch).await {
                let message = format!("{:#}", e);
                tracing::error!(video_id = %video_id, error = %message, "Video processing failed");
                if let Err(repo_err) = pipeline.repository.mark_failed(video_id, message).await {
                    tracing::error!(
                        video_id = %video_id,
                        error = %repo_err,
                        "Failed to persist failed status"
                    );
                }
            } else {
                tracing::info!(video_id = %video_id, "Video processing completed successfully");
            }
        })
    }

    async fn process(&self, video_id: Uuid, scratch: TempPath) -> Result<()> {
        let video = self
            .repository
            .get(video_id)
            .await
            .context("Failed to load video record")?
            .context("Video record missing")?;

        self.storage
            .upload_file(&scratch, &video.storage_path, &video.mime_type)
            .await
            .context("Failed to move source into storage")?;
        drop(scratch);

        self.repository
            .begin_processing(video_id)
            .await
            .context("Failed to transition video to processing")?;

        let input = self
            .storage
            .resolve(&video.storage_path)
            .await
            .context("Failed to resolve source for the encoder")?;
        let input_is_staged = self.storage.backend_type() == StorageBackend::S3;

        let result = self.transcode_and_publish(video_id, &video.hls_path, &input).await;

        if input_is_staged {
            if let Err(e) = tokio::fs::remove_file(&input).await {
                tracing::warn!(video_id = %video_id, error = %e, "Failed to remove staged source copy");
            }
        }

        result
    }

    async fn transcode_and_publish(
        &self,
        video_id: Uuid,
        hls_prefix: &str,
        input: &Path,
    ) -> Result<()> {
        let probe = self
            .transcoder
            .probe(input)
            .await
            .context("Failed to probe video")?;

        self.repository
            .set_probe_metadata(
                video_id,
                probe.duration,
                Resolution {
                    width: probe.width,
                    height: probe.height,
                },
            )
            .await
            .context("Failed to persist probe metadata")?;

        tracing::info!(
            video_id = %video_id,
            duration = probe.duration,
            resolution = %format!("{}x{}", probe.width, probe.height),
            "Video metadata extracted"
        );

        let out_dir = TempDir::new().context("Failed to create transcode output directory")?;
        let ladder = derive_ladder(probe.height);

        let succeeded = self
            .transcoder
            .encode_ladder(input, out_dir.path(), &ladder)
            .await
            .context("Failed to generate HLS renditions")?;

        tracing::info!(
            video_id = %video_id,
            rendition_count = succeeded.len(),
            ladder_size = ladder.len(),
            "HLS renditions generated"
        );

        self.upload_hls_tree(hls_prefix, out_dir.path())
            .await
            .context("Failed to upload HLS tree")?;

        // Thumbnail failures never fail the pipeline.
        if let Err(e) = self
            .publish_thumbnail(hls_prefix, input, out_dir.path(), probe.duration)
            .await
        {
            tracing::warn!(video_id = %video_id, error = %e, "Thumbnail generation failed");
        }

        // The master goes up last so a ready record always points at a
        // complete tree.
        let master = self.transcoder.master_playlist(&succeeded);
        let master_key = keys::hls_file(hls_prefix, "master.m3u8");
        self.storage
            .upload(&master_key, master.into_bytes(), PLAYLIST_CONTENT_TYPE)
            .await
            .context("Failed to upload master playlist")?;

        self.repository
            .mark_ready(video_id, master_key)
            .await
            .context("Failed to transition video to ready")?;

        Ok(())
    }

    /// Upload everything the encoder produced: variant playlists buffered,
    /// segments streamed.
    async fn upload_hls_tree(&self, hls_prefix: &str, out_dir: &Path) -> Result<()> {
        let mut entries = tokio::fs::read_dir(out_dir)
            .await
            .context("Failed to read transcode output directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let key = keys::hls_file(hls_prefix, &name);

            match path.extension().and_then(|s| s.to_str()) {
                Some("m3u8") => {
                    let content = tokio::fs::read(&path).await?;
                    self.storage
                        .upload(&key, content, PLAYLIST_CONTENT_TYPE)
                        .await
                        .with_context(|| format!("Failed to upload playlist {}", name))?;
                }
                Some("ts") => {
                    let file = tokio::fs::File::open(&path).await?;
                    self.storage
                        .upload_stream(&key, SEGMENT_CONTENT_TYPE, Box::pin(file))
                        .await
                        .with_context(|| format!("Failed to upload segment {}", name))?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    async fn publish_thumbnail(
        &self,
        hls_prefix: &str,
        input: &Path,
        out_dir: &Path,
        duration: f64,
    ) -> Result<()> {
        let thumb_path = out_dir.join("thumbnail.jpg");
        self.transcoder
            .thumbnail(input, &thumb_path, duration * 0.1)
            .await?;

        let content = tokio::fs::read(&thumb_path).await?;
        self.storage
            .upload(
                &keys::hls_file(hls_prefix, "thumbnail.jpg"),
                content,
                "image/jpeg",
            )
            .await?;

        Ok(())
    }

    /// Startup sweep: anything still in-flight did not survive the restart.
    pub async fn fail_interrupted(&self) -> usize {
        let mut failed = 0;

        for status in [VideoStatus::Uploading, VideoStatus::Processing] {
            let stuck = match self.repository.list_by_status(status).await {
                Ok(videos) => videos,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to list in-flight videos at startup");
                    continue;
                }
            };

            for video in stuck {
                match self
                    .repository
                    .mark_failed(video.id, INTERRUPTED_ERROR.to_string())
                    .await
                {
                    Ok(()) => {
                        tracing::warn!(video_id = %video.id, "Marked interrupted video as failed");
                        failed += 1;
                    }
                    Err(e) => {
                        tracing::error!(video_id = %video.id, error = %e, "Failed to mark interrupted video");
                    }
                }
            }
        }

        failed
    }
}
