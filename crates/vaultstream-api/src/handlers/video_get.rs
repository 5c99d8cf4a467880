use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use vaultstream_core::models::{VideoResponse, Visibility};
use vaultstream_core::AppError;

use crate::auth::OptionalUserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video metadata (no stream URL)", body = VideoResponse),
        (status = 403, description = "Private video, not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    user: OptionalUserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .repository
        .get(id)
        .await?
        .ok_or_else(|| AppError::VideoNotFound(id.to_string()))?;

    if video.visibility == Visibility::Private && user.user_id() != Some(video.owner_user_id) {
        return Err(AppError::AccessDenied.into());
    }

    Ok(Json(VideoResponse::from(video)))
}
