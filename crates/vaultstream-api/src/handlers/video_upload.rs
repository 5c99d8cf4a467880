use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use utoipa::ToSchema;
use uuid::Uuid;

use vaultstream_core::models::{Video, VideoStatus, Visibility};
use vaultstream_core::{passphrase, AppError};
use vaultstream_storage::keys;

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 5000;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub video_id: Uuid,
    pub status: VideoStatus,
}

struct UploadedFile {
    scratch: NamedTempFile,
    original_filename: String,
    extension: String,
    content_type: String,
    size: u64,
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> HttpAppError {
    HttpAppError(AppError::InvalidInput(format!(
        "Invalid multipart request: {}",
        err
    )))
}

fn parse_visibility(value: &str) -> Result<Visibility, AppError> {
    match value.trim().to_lowercase().as_str() {
        "public" => Ok(Visibility::Public),
        "unlisted" => Ok(Visibility::Unlisted),
        "private" => Ok(Visibility::Private),
        other => Err(AppError::InvalidInput(format!(
            "Invalid visibility '{}', expected public, unlisted, or private",
            other
        ))),
    }
}

/// Stream the file field to a scratch file, enforcing the size ceiling
/// without ever holding the upload in memory.
async fn receive_file(
    mut field: Field<'_>,
    state: &AppState,
) -> Result<UploadedFile, HttpAppError> {
    let original_filename = field
        .file_name()
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::InvalidInput("File field is missing a filename".to_string()))?;

    let extension = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Missing file extension: {}", original_filename))
        })?;

    if !state.config.allowed_video_extensions.contains(&extension) {
        return Err(AppError::InvalidInput(format!(
            "Invalid extension '{}', allowed: {}",
            extension,
            state.config.allowed_video_extensions.join(", ")
        ))
        .into());
    }

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let scratch = tempfile::Builder::new()
        .prefix("vaultstream-upload-")
        .tempfile_in(&state.config.scratch_dir)
        .map_err(|e| AppError::Internal(format!("Failed to create scratch file: {}", e)))?;
    let mut writer = tokio::fs::File::from_std(
        scratch
            .reopen()
            .map_err(|e| AppError::Internal(format!("Failed to reopen scratch file: {}", e)))?,
    );

    let max_bytes = state.config.max_upload_size_bytes as u64;
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
        size += chunk.len() as u64;
        if size > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Upload exceeds the maximum of {} bytes",
                max_bytes
            ))
            .into());
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write scratch file: {}", e)))?;
    }

    if size == 0 {
        return Err(AppError::InvalidInput("File is empty".to_string()).into());
    }

    writer
        .sync_all()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to sync scratch file: {}", e)))?;

    Ok(UploadedFile {
        scratch,
        original_filename,
        extension,
        content_type,
        size,
    })
}

#[utoipa::path(
    post,
    path = "/api/videos/upload",
    tag = "videos",
    responses(
        (status = 201, description = "Upload accepted, processing started", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut visibility = Visibility::default();
    let mut raw_passphrase: Option<String> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(field.text().await.map_err(bad_multipart)?),
            "description" => description = Some(field.text().await.map_err(bad_multipart)?),
            "visibility" => {
                visibility = parse_visibility(&field.text().await.map_err(bad_multipart)?)?
            }
            "passphrase" => {
                let value = field.text().await.map_err(bad_multipart)?;
                if !value.is_empty() {
                    raw_passphrase = Some(value);
                }
            }
            "file" => file = Some(receive_file(field, &state).await?),
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::InvalidInput("A title is required".to_string()))?;
    if title.len() > MAX_TITLE_LEN {
        return Err(AppError::InvalidInput(format!(
            "Title exceeds {} characters",
            MAX_TITLE_LEN
        ))
        .into());
    }
    if description.as_ref().is_some_and(|d| d.len() > MAX_DESCRIPTION_LEN) {
        return Err(AppError::InvalidInput(format!(
            "Description exceeds {} characters",
            MAX_DESCRIPTION_LEN
        ))
        .into());
    }

    let file =
        file.ok_or_else(|| AppError::InvalidInput("A file field is required".to_string()))?;

    let passphrase_hash = match raw_passphrase {
        Some(p) => Some(passphrase::hash_passphrase(&p, state.config.passphrase_time_cost).await?),
        None => None,
    };

    let video_id = Uuid::new_v4();
    let now = Utc::now();
    let video = Video {
        id: video_id,
        owner_user_id: user.user_id,
        title,
        description,
        visibility,
        passphrase_hash,
        storage_path: keys::source_key(user.user_id, video_id, &file.extension),
        hls_path: keys::hls_prefix(user.user_id, video_id),
        master_playlist_path: None,
        duration: None,
        resolution: None,
        file_size: file.size as i64,
        mime_type: file.content_type,
        original_filename: file.original_filename,
        status: VideoStatus::Uploading,
        processing_error: None,
        views: 0,
        created_at: now,
        updated_at: now,
    };

    state.videos.repository.insert(video).await?;

    tracing::info!(
        video_id = %video_id,
        owner = %user.user_id,
        size_bytes = file.size,
        "Upload accepted, starting pipeline"
    );

    // The pipeline runs detached from this request; a client disconnect
    // does not cancel encoding.
    state
        .videos
        .pipeline
        .spawn(video_id, file.scratch.into_temp_path());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            video_id,
            status: VideoStatus::Uploading,
        }),
    ))
}
