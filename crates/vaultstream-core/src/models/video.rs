use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Who may obtain a playback token for a video.
///
/// `Unlisted` and `Public` behave identically at the access gate; they only
/// differ in whether the video appears on listing surfaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Unlisted
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploading,
    Processing,
    Ready,
    Failed,
}

impl VideoStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Failed)
    }
}

impl Display for VideoStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VideoStatus::Uploading => write!(f, "uploading"),
            VideoStatus::Processing => write!(f, "processing"),
            VideoStatus::Ready => write!(f, "ready"),
            VideoStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Display for Resolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A video record.
///
/// Created by the upload handler in `Uploading` state; mutated only by the
/// processing pipeline (status, probe metadata, master playlist path) and by
/// owner-initiated edits. `passphrase_hash` never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub passphrase_hash: Option<String>,
    pub storage_path: String,
    pub hls_path: String,
    pub master_playlist_path: Option<String>,
    pub duration: Option<f64>,
    pub resolution: Option<Resolution>,
    pub file_size: i64,
    pub mime_type: String,
    pub original_filename: String,
    pub status: VideoStatus,
    pub processing_error: Option<String>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn requires_passphrase(&self) -> bool {
        self.passphrase_hash.is_some()
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_user_id == user_id
    }

    /// Storage key of the ffmpeg-produced thumbnail, if processing got that far.
    pub fn thumbnail_path(&self) -> String {
        format!("{}/thumbnail.jpg", self.hls_path)
    }
}

/// Metadata surface returned by `GET /videos/{id}`. Never includes the
/// passphrase hash or a stream URL.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub status: VideoStatus,
    pub duration: Option<f64>,
    pub resolution: Option<Resolution>,
    pub file_size: i64,
    pub mime_type: String,
    pub original_filename: String,
    pub passphrase_protected: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        VideoResponse {
            id: video.id,
            title: video.title,
            description: video.description,
            visibility: video.visibility,
            status: video.status,
            duration: video.duration,
            resolution: video.resolution,
            file_size: video.file_size,
            mime_type: video.mime_type,
            original_filename: video.original_filename,
            passphrase_protected: video.passphrase_hash.is_some(),
            views: video.views,
            created_at: video.created_at,
            processing_error: video.processing_error,
        }
    }
}

/// Successful access-gate result: a tokenized stream URL plus the metadata
/// subset safe to disclose to a viewer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlaybackGrant {
    pub stream_url: String,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<f64>,
    pub resolution: Option<Resolution>,
    pub thumbnail_path: String,
    pub created_at: DateTime<Utc>,
    pub views: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_video() -> Video {
        Video {
            id: Uuid::new_v4(),
            owner_user_id: Uuid::new_v4(),
            title: "bunny".to_string(),
            description: None,
            visibility: Visibility::Unlisted,
            passphrase_hash: None,
            storage_path: "videos/u/v/original.mp4".to_string(),
            hls_path: "videos/u/v/hls".to_string(),
            master_playlist_path: None,
            duration: None,
            resolution: None,
            file_size: 1024,
            mime_type: "video/mp4".to_string(),
            original_filename: "bunny.mp4".to_string(),
            status: VideoStatus::Uploading,
            processing_error: None,
            views: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_terminality() {
        assert!(!VideoStatus::Uploading.is_terminal());
        assert!(!VideoStatus::Processing.is_terminal());
        assert!(VideoStatus::Ready.is_terminal());
        assert!(VideoStatus::Failed.is_terminal());
    }

    #[test]
    fn test_visibility_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&Visibility::Private).unwrap(),
            "\"private\""
        );
        let parsed: Visibility = serde_json::from_str("\"unlisted\"").unwrap();
        assert_eq!(parsed, Visibility::Unlisted);
    }

    #[test]
    fn test_video_response_never_exposes_passphrase_hash() {
        let mut video = test_video();
        video.passphrase_hash = Some("$argon2id$secret".to_string());
        let response = VideoResponse::from(video);
        assert!(response.passphrase_protected);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("passphrase_hash"));
    }

    #[test]
    fn test_thumbnail_path_is_under_hls_dir() {
        let video = test_video();
        assert_eq!(video.thumbnail_path(), "videos/u/v/hls/thumbnail.jpg");
    }

    #[test]
    fn test_owner_check() {
        let video = test_video();
        assert!(video.is_owner(video.owner_user_id));
        assert!(!video.is_owner(Uuid::new_v4()));
    }
}
