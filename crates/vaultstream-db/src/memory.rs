//! In-memory video repository.
//!
//! Backs the default wiring and the test suite. A `tokio::sync::RwLock`
//! serializes writes, which is what makes the conditional status
//! transitions safe under concurrent pipeline tasks.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use vaultstream_core::models::{Resolution, Video, VideoStatus};

use crate::repository::{RepoError, RepoResult, VideoPatch, VideoRepository};

#[derive(Clone, Default)]
pub struct MemoryVideoRepository {
    videos: Arc<RwLock<HashMap<Uuid, Video>>>,
}

impl MemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoRepository for MemoryVideoRepository {
    async fn insert(&self, video: Video) -> RepoResult<()> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&video.id) {
            return Err(RepoError::Backend(format!(
                "duplicate video id: {}",
                video.id
            )));
        }
        videos.insert(video.id, video);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Video>> {
        Ok(self.videos.read().await.get(&id).cloned())
    }

    async fn begin_processing(&self, id: Uuid) -> RepoResult<Video> {
        let mut videos = self.videos.write().await;
        let video = videos.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        if video.status != VideoStatus::Uploading {
            return Err(RepoError::InvalidTransition {
                from: video.status,
                to: VideoStatus::Processing,
            });
        }
        video.status = VideoStatus::Processing;
        video.updated_at = Utc::now();
        Ok(video.clone())
    }

    async fn set_probe_metadata(
        &self,
        id: Uuid,
        duration: f64,
        resolution: Resolution,
    ) -> RepoResult<()> {
        let mut videos = self.videos.write().await;
        let video = videos.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        video.duration = Some(duration);
        video.resolution = Some(resolution);
        video.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_ready(&self, id: Uuid, master_playlist_path: String) -> RepoResult<()> {
        let mut videos = self.videos.write().await;
        let video = videos.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        if video.status != VideoStatus::Processing {
            return Err(RepoError::InvalidTransition {
                from: video.status,
                to: VideoStatus::Ready,
            });
        }
        video.status = VideoStatus::Ready;
        video.master_playlist_path = Some(master_playlist_path);
        video.processing_error = None;
        video.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, processing_error: String) -> RepoResult<()> {
        let mut videos = self.videos.write().await;
        let video = videos.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        if video.status.is_terminal() {
            return Err(RepoError::InvalidTransition {
                from: video.status,
                to: VideoStatus::Failed,
            });
        }
        video.status = VideoStatus::Failed;
        video.processing_error = Some(processing_error);
        video.updated_at = Utc::now();
        Ok(())
    }

    async fn update_metadata(&self, id: Uuid, patch: VideoPatch) -> RepoResult<Video> {
        let mut videos = self.videos.write().await;
        let video = videos.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        if let Some(title) = patch.title {
            video.title = title;
        }
        if let Some(description) = patch.description {
            video.description = Some(description);
        }
        if let Some(visibility) = patch.visibility {
            video.visibility = visibility;
        }
        if patch.clear_passphrase {
            video.passphrase_hash = None;
        } else if let Some(hash) = patch.passphrase_hash {
            video.passphrase_hash = Some(hash);
        }
        video.updated_at = Utc::now();
        Ok(video.clone())
    }

    async fn remove(&self, id: Uuid) -> RepoResult<Option<Video>> {
        Ok(self.videos.write().await.remove(&id))
    }

    async fn increment_views(&self, id: Uuid) -> RepoResult<i64> {
        let mut videos = self.videos.write().await;
        let video = videos.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        video.views += 1;
        Ok(video.views)
    }

    async fn list_by_status(&self, status: VideoStatus) -> RepoResult<Vec<Video>> {
        Ok(self
            .videos
            .read()
            .await
            .values()
            .filter(|v| v.status == status)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstream_core::models::Visibility;

    fn test_video(id: Uuid) -> Video {
        Video {
            id,
            owner_user_id: Uuid::new_v4(),
            title: "clip".to_string(),
            description: None,
            visibility: Visibility::Unlisted,
            passphrase_hash: None,
            storage_path: format!("videos/owner/{}/original.mp4", id),
            hls_path: format!("videos/owner/{}/hls", id),
            master_playlist_path: None,
            duration: None,
            resolution: None,
            file_size: 42,
            mime_type: "video/mp4".to_string(),
            original_filename: "clip.mp4".to_string(),
            status: VideoStatus::Uploading,
            processing_error: None,
            views: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle_to_ready() {
        let repo = MemoryVideoRepository::new();
        let id = Uuid::new_v4();
        repo.insert(test_video(id)).await.unwrap();

        repo.begin_processing(id).await.unwrap();
        repo.set_probe_metadata(
            id,
            30.0,
            Resolution {
                width: 1920,
                height: 1080,
            },
        )
        .await
        .unwrap();
        repo.mark_ready(id, "videos/owner/v/hls/master.m3u8".to_string())
            .await
            .unwrap();

        let video = repo.get(id).await.unwrap().unwrap();
        assert_eq!(video.status, VideoStatus::Ready);
        assert!(video.master_playlist_path.is_some());
        assert_eq!(video.duration, Some(30.0));
    }

    #[tokio::test]
    async fn test_ready_is_terminal() {
        let repo = MemoryVideoRepository::new();
        let id = Uuid::new_v4();
        repo.insert(test_video(id)).await.unwrap();
        repo.begin_processing(id).await.unwrap();
        repo.mark_ready(id, "m".to_string()).await.unwrap();

        let err = repo.mark_failed(id, "late error".to_string()).await;
        assert!(matches!(err, Err(RepoError::InvalidTransition { .. })));
        let video = repo.get(id).await.unwrap().unwrap();
        assert_eq!(video.status, VideoStatus::Ready);
        assert!(video.processing_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_is_terminal() {
        let repo = MemoryVideoRepository::new();
        let id = Uuid::new_v4();
        repo.insert(test_video(id)).await.unwrap();
        repo.mark_failed(id, "probe failed".to_string()).await.unwrap();

        assert!(repo.begin_processing(id).await.is_err());
        let err = repo.mark_ready(id, "m".to_string()).await;
        assert!(matches!(err, Err(RepoError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_begin_processing_requires_uploading() {
        let repo = MemoryVideoRepository::new();
        let id = Uuid::new_v4();
        repo.insert(test_video(id)).await.unwrap();
        repo.begin_processing(id).await.unwrap();

        // A second pipeline for the same record must not win.
        assert!(matches!(
            repo.begin_processing(id).await,
            Err(RepoError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let repo = MemoryVideoRepository::new();
        let id = Uuid::new_v4();
        repo.insert(test_video(id)).await.unwrap();
        assert!(repo.insert(test_video(id)).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let repo = MemoryVideoRepository::new();
        let id = Uuid::new_v4();
        repo.insert(test_video(id)).await.unwrap();

        assert!(repo.remove(id).await.unwrap().is_some());
        assert!(repo.remove(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_metadata_and_clear_passphrase() {
        let repo = MemoryVideoRepository::new();
        let id = Uuid::new_v4();
        repo.insert(test_video(id)).await.unwrap();

        let updated = repo
            .update_metadata(
                id,
                VideoPatch {
                    title: Some("renamed".to_string()),
                    visibility: Some(Visibility::Private),
                    passphrase_hash: Some("$argon2id$x".to_string()),
                    ..VideoPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.visibility, Visibility::Private);
        assert!(updated.passphrase_hash.is_some());

        let cleared = repo
            .update_metadata(
                id,
                VideoPatch {
                    clear_passphrase: true,
                    ..VideoPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.passphrase_hash.is_none());
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let repo = MemoryVideoRepository::new();
        let stuck = Uuid::new_v4();
        let done = Uuid::new_v4();
        repo.insert(test_video(stuck)).await.unwrap();
        repo.insert(test_video(done)).await.unwrap();
        repo.begin_processing(stuck).await.unwrap();
        repo.begin_processing(done).await.unwrap();
        repo.mark_ready(done, "m".to_string()).await.unwrap();

        let processing = repo.list_by_status(VideoStatus::Processing).await.unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, stuck);
    }

    #[tokio::test]
    async fn test_increment_views() {
        let repo = MemoryVideoRepository::new();
        let id = Uuid::new_v4();
        repo.insert(test_video(id)).await.unwrap();
        assert_eq!(repo.increment_views(id).await.unwrap(), 1);
        assert_eq!(repo.increment_views(id).await.unwrap(), 2);
    }
}
