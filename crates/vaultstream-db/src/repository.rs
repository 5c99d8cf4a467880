use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use vaultstream_core::models::{Resolution, Video, VideoStatus, Visibility};
use vaultstream_core::AppError;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Video not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: VideoStatus,
        to: VideoStatus,
    },

    #[error("Repository backend error: {0}")]
    Backend(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => AppError::VideoNotFound(id.to_string()),
            RepoError::InvalidTransition { .. } => AppError::Internal(err.to_string()),
            RepoError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

/// Owner-initiated metadata changes. `clear_passphrase` and
/// `passphrase_hash` are mutually exclusive; setting a hash while clearing
/// is rejected by the handler before it reaches the repository.
#[derive(Debug, Default, Clone)]
pub struct VideoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub passphrase_hash: Option<String>,
    pub clear_passphrase: bool,
}

/// Persistence seam for video records.
///
/// All status writes are conditional on the current status so concurrent
/// writers cannot regress a record (`ready`/`failed` are terminal).
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn insert(&self, video: Video) -> RepoResult<()>;

    async fn get(&self, id: Uuid) -> RepoResult<Option<Video>>;

    /// Transition `uploading -> processing`. Fails with `InvalidTransition`
    /// from any other state.
    async fn begin_processing(&self, id: Uuid) -> RepoResult<Video>;

    /// Record probe results while the video is processing.
    async fn set_probe_metadata(
        &self,
        id: Uuid,
        duration: f64,
        resolution: Resolution,
    ) -> RepoResult<()>;

    /// Transition `processing -> ready` and set the master playlist path.
    async fn mark_ready(&self, id: Uuid, master_playlist_path: String) -> RepoResult<()>;

    /// Transition `uploading|processing -> failed` with the pipeline error.
    /// A no-op returning `InvalidTransition` when the record is already
    /// terminal, so a late failure cannot clobber `ready`.
    async fn mark_failed(&self, id: Uuid, processing_error: String) -> RepoResult<()>;

    /// Apply owner-initiated metadata edits; returns the updated record.
    async fn update_metadata(&self, id: Uuid, patch: VideoPatch) -> RepoResult<Video>;

    /// Remove the record, returning it for storage cleanup. `None` when the
    /// record was already gone (delete is idempotent at the HTTP layer).
    async fn remove(&self, id: Uuid) -> RepoResult<Option<Video>>;

    async fn increment_views(&self, id: Uuid) -> RepoResult<i64>;

    /// Records currently in the given status. Used by the startup sweep to
    /// fail videos whose pipeline did not survive a restart.
    async fn list_by_status(&self, status: VideoStatus) -> RepoResult<Vec<Video>>;
}
