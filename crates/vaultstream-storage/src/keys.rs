//! Shared key generation for storage backends.
//!
//! Layout: `videos/{owner_user_id}/{video_id}/original{.ext}` for the
//! untouched source blob, `videos/{owner_user_id}/{video_id}/hls/...` for
//! the transcoded tree.

use uuid::Uuid;

/// Prefix holding everything that belongs to one video.
pub fn video_prefix(owner_user_id: Uuid, video_id: Uuid) -> String {
    format!("videos/{}/{}", owner_user_id, video_id)
}

/// Key of the untouched source blob. `extension` is the lowercased source
/// container extension, without the dot; an empty extension omits the dot.
pub fn source_key(owner_user_id: Uuid, video_id: Uuid, extension: &str) -> String {
    if extension.is_empty() {
        format!("{}/original", video_prefix(owner_user_id, video_id))
    } else {
        format!(
            "{}/original.{}",
            video_prefix(owner_user_id, video_id),
            extension
        )
    }
}

/// Prefix of the HLS tree (`master.m3u8`, variant playlists, segments,
/// `thumbnail.jpg`).
pub fn hls_prefix(owner_user_id: Uuid, video_id: Uuid) -> String {
    format!("{}/hls", video_prefix(owner_user_id, video_id))
}

/// Key of a file inside a video's HLS tree.
pub fn hls_file(hls_prefix: &str, name: &str) -> String {
    format!("{}/{}", hls_prefix, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let owner = Uuid::nil();
        let video = Uuid::nil();
        assert_eq!(
            source_key(owner, video, "mp4"),
            format!("videos/{}/{}/original.mp4", owner, video)
        );
        assert_eq!(
            hls_prefix(owner, video),
            format!("videos/{}/{}/hls", owner, video)
        );
        assert_eq!(
            hls_file(&hls_prefix(owner, video), "master.m3u8"),
            format!("videos/{}/{}/hls/master.m3u8", owner, video)
        );
    }

    #[test]
    fn test_source_key_without_extension() {
        let owner = Uuid::nil();
        let video = Uuid::nil();
        assert!(source_key(owner, video, "").ends_with("/original"));
    }
}
