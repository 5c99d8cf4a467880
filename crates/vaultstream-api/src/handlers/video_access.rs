use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use vaultstream_core::models::{PlaybackGrant, VideoStatus, Visibility};
use vaultstream_core::{passphrase, AppError};

use crate::auth::OptionalUserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AccessRequest {
    pub passphrase: Option<String>,
}

/// The access gate: enforce visibility and passphrase, then convert the
/// one-shot check into a time-limited capability (the master-playlist
/// token). Per-segment authorization rides on the tokens rewritten into
/// the playlists, so the passphrase is never rechecked at segment time.
#[utoipa::path(
    post,
    path = "/api/videos/{id}/access",
    tag = "videos",
    params(("id" = Uuid, Path, description = "Video ID")),
    request_body = AccessRequest,
    responses(
        (status = 200, description = "Playback granted", body = PlaybackGrant),
        (status = 401, description = "Passphrase required or invalid", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 409, description = "Video not ready", body = ErrorResponse)
    )
)]
pub async fn request_access(
    State(state): State<Arc<AppState>>,
    user: OptionalUserContext,
    Path(id): Path<Uuid>,
    body: Option<Json<AccessRequest>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .videos
        .repository
        .get(id)
        .await?
        .ok_or_else(|| AppError::VideoNotFound(id.to_string()))?;

    if video.status != VideoStatus::Ready {
        return Err(AppError::VideoNotReady(video.status.to_string()).into());
    }

    if video.visibility == Visibility::Private && user.user_id() != Some(video.owner_user_id) {
        return Err(AppError::AccessDenied.into());
    }

    if let Some(ref hash) = video.passphrase_hash {
        let supplied = body
            .as_ref()
            .and_then(|Json(body)| body.passphrase.as_deref())
            .filter(|p| !p.is_empty());

        let Some(supplied) = supplied else {
            return Err(AppError::PassphraseRequired.into());
        };

        if !passphrase::verify_passphrase(supplied, hash).await? {
            tracing::debug!(video_id = %id, "Passphrase verification failed");
            return Err(AppError::InvalidPassphrase.into());
        }
    }

    let token = state.signer.mint(id, "master.m3u8", user.user_id(), None);
    let stream_url = format!("/api/stream/{}/master.m3u8?token={}", id, token);

    let views = state.videos.repository.increment_views(id).await?;
    let thumbnail_path = video.thumbnail_path();

    tracing::info!(video_id = %id, user = ?user.user_id(), "Playback granted");

    Ok(Json(PlaybackGrant {
        stream_url,
        title: video.title,
        description: video.description,
        duration: video.duration,
        resolution: video.resolution,
        thumbnail_path,
        created_at: video.created_at,
        views,
    }))
}
