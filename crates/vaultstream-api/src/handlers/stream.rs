use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use vaultstream_core::models::VideoStatus;
use vaultstream_core::AppError;
use vaultstream_storage::keys;

use crate::error::HttpAppError;
use crate::hls::{classify_stream_file, rewrite_playlist, StreamFileKind};
use crate::state::AppState;
use crate::token::StreamClaims;

const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";
const SEGMENT_CACHE_CONTROL: &str = "public, max-age=31536000";

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Serve `/stream/{video_id}/{file}`: the rewritten master playlist,
/// rewritten variant playlists, and streamed segments, dispatched by
/// trailing extension.
///
/// Every request walks the same verification ladder: filename hygiene,
/// token signature, resource equality against the final path segment,
/// video-id equality, and a `ready` record.
#[utoipa::path(
    get,
    path = "/api/stream/{video_id}/{file}",
    tag = "stream",
    params(
        ("video_id" = Uuid, Path, description = "Video ID"),
        ("file" = String, Path, description = "master.m3u8, a variant playlist, or a segment"),
        ("token" = String, Query, description = "Signed stream token bound to this file")
    ),
    responses(
        (status = 200, description = "Playlist or segment"),
        (status = 403, description = "Invalid, expired, or mismatched token"),
        (status = 404, description = "Video or file not found")
    )
)]
pub async fn stream_file(
    State(state): State<Arc<AppState>>,
    Path((video_id, file)): Path<(Uuid, String)>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, HttpAppError> {
    let kind = classify_stream_file(&file)?;

    let token = query.token.ok_or(AppError::InvalidSignature)?;
    let claims = state.signer.verify(&token)?;

    // The token is only valid for the exact file it was minted for.
    if claims.resource != file {
        return Err(AppError::ResourceMismatch(file).into());
    }
    if claims.video_id != video_id {
        return Err(AppError::ResourceMismatch(file).into());
    }

    let video = state
        .videos
        .repository
        .get(video_id)
        .await?
        .ok_or_else(|| AppError::VideoNotFound(video_id.to_string()))?;
    if video.status != VideoStatus::Ready {
        return Err(AppError::VideoNotFound(video_id.to_string()).into());
    }

    match kind {
        StreamFileKind::MasterPlaylist => {
            serve_master(&state, &video.hls_path, &claims).await
        }
        StreamFileKind::VariantPlaylist => {
            serve_variant(&state, &video.hls_path, &file, &claims).await
        }
        StreamFileKind::Segment => serve_segment(&state, &video.hls_path, &file).await,
    }
}

/// Buffered read plus rewrite: every variant line gets its own token so
/// variant requests verify by resource equality without a session.
async fn serve_master(
    state: &AppState,
    hls_path: &str,
    claims: &StreamClaims,
) -> Result<Response, HttpAppError> {
    let key = keys::hls_file(hls_path, "master.m3u8");
    let content = state.videos.storage.download(&key).await?;
    let content = String::from_utf8(content)
        .map_err(|_| AppError::Internal("Master playlist is not valid UTF-8".to_string()))?;

    let rewritten = rewrite_playlist(&content, ".m3u8", |resource| {
        state
            .signer
            .mint(claims.video_id, resource, claims.user_id, None)
    });

    playlist_response(rewritten)
}

async fn serve_variant(
    state: &AppState,
    hls_path: &str,
    file: &str,
    claims: &StreamClaims,
) -> Result<Response, HttpAppError> {
    let key = keys::hls_file(hls_path, file);
    let content = state.videos.storage.download(&key).await?;
    let content = String::from_utf8(content)
        .map_err(|_| AppError::Internal("Variant playlist is not valid UTF-8".to_string()))?;

    let rewritten = rewrite_playlist(&content, ".ts", |resource| {
        state
            .signer
            .mint(claims.video_id, resource, claims.user_id, None)
    });

    playlist_response(rewritten)
}

/// Segments stream straight from storage. Errors after headers are sent
/// terminate the connection; there is no rewriting the response at that
/// point.
async fn serve_segment(
    state: &AppState,
    hls_path: &str,
    file: &str,
) -> Result<Response, HttpAppError> {
    let key = keys::hls_file(hls_path, file);
    let stream = state.videos.storage.download_stream(&key).await?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, SEGMENT_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, SEGMENT_CACHE_CONTROL)
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            HttpAppError(AppError::Internal(format!(
                "Failed to build segment response: {}",
                e
            )))
        })
}

fn playlist_response(content: String) -> Result<Response, HttpAppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(content))
        .map_err(|e| {
            HttpAppError(AppError::Internal(format!(
                "Failed to build playlist response: {}",
                e
            )))
        })
}
