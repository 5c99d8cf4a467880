use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use vaultstream_core::AppError;

use crate::auth::UserContext;
use crate::error::HttpAppError;
use crate::state::AppState;

/// Owner-initiated delete. Removes the source blob and the entire HLS
/// directory from storage, then the record. Storage failures are logged
/// but never block the record delete; a repeat call returns 404.
#[utoipa::path(
    delete,
    path = "/api/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Video deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Video not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .repository
        .get(id)
        .await?
        .ok_or_else(|| AppError::VideoNotFound(id.to_string()))?;

    if !video.is_owner(user.user_id) {
        return Err(AppError::AccessDenied.into());
    }

    if let Err(e) = state.videos.storage.delete(&video.storage_path).await {
        tracing::warn!(video_id = %id, key = %video.storage_path, error = %e, "Failed to delete source blob");
    }
    if let Err(e) = state.videos.storage.delete_prefix(&video.hls_path).await {
        tracing::warn!(video_id = %id, prefix = %video.hls_path, error = %e, "Failed to delete HLS directory");
    }

    state.videos.repository.remove(id).await?;

    tracing::info!(video_id = %id, owner = %user.user_id, "Video deleted");

    Ok(StatusCode::NO_CONTENT)
}
