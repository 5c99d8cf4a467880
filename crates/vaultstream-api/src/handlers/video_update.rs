use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use vaultstream_core::models::{VideoResponse, Visibility};
use vaultstream_core::{passphrase, AppError};
use vaultstream_db::VideoPatch;

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateVideoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    /// Set a new passphrase. Mutually exclusive with `clear_passphrase`.
    pub passphrase: Option<String>,
    #[serde(default)]
    pub clear_passphrase: bool,
}

#[utoipa::path(
    patch,
    path = "/api/videos/{id}",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    request_body = UpdateVideoRequest,
    responses(
        (status = 200, description = "Updated metadata", body = VideoResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn update_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVideoRequest>,
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

    if request.clear_passphrase && request.passphrase.is_some() {
        return Err(AppError::InvalidInput(
            "Cannot set and clear the passphrase in the same request".to_string(),
        )
        .into());
    }

    if let Some(ref title) = request.title {
        if title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title cannot be empty".to_string()).into());
        }
    }

    let passphrase_hash = match request.passphrase {
        Some(ref p) if !p.is_empty() => {
            Some(passphrase::hash_passphrase(p, state.config.passphrase_time_cost).await?)
        }
        Some(_) => {
            return Err(
                AppError::InvalidInput("Passphrase cannot be empty".to_string()).into(),
            )
        }
        None => None,
    };

    let updated = state
        .videos
        .repository
        .update_metadata(
            id,
            VideoPatch {
                title: request.title.map(|t| t.trim().to_string()),
                description: request.description,
                visibility: request.visibility,
                passphrase_hash,
                clear_passphrase: request.clear_passphrase,
            },
        )
        .await?;

    tracing::info!(video_id = %id, "Video metadata updated");

    Ok(Json(VideoResponse::from(updated)))
}
