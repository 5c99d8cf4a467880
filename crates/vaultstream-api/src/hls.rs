//! HLS playlist rewriting and stream-path hygiene.
//!
//! Playlists are rewritten on the fly so every child URL carries its own
//! signed token; filenames are validated against a tight charset before
//! they touch storage keys.

use vaultstream_core::AppError;

/// What a `/stream/{video_id}/{file}` request is asking for, dispatched by
/// trailing extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFileKind {
    MasterPlaylist,
    VariantPlaylist,
    Segment,
}

fn stem_is_clean(stem: &str) -> bool {
    !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validate a stream filename (`[A-Za-z0-9_-]+` plus a `.m3u8` or `.ts`
/// extension) and classify it. Anything else is refused before it can
/// reach storage.
pub fn classify_stream_file(file: &str) -> Result<StreamFileKind, AppError> {
    if let Some(stem) = file.strip_suffix(".m3u8") {
        if !stem_is_clean(stem) {
            return Err(AppError::InvalidPlaylist(file.to_string()));
        }
        if stem == "master" {
            return Ok(StreamFileKind::MasterPlaylist);
        }
        return Ok(StreamFileKind::VariantPlaylist);
    }

    if let Some(stem) = file.strip_suffix(".ts") {
        if !stem_is_clean(stem) {
            return Err(AppError::InvalidSegment(file.to_string()));
        }
        return Ok(StreamFileKind::Segment);
    }

    Err(AppError::NotFound(format!(
        "unsupported stream file: {}",
        file
    )))
}

/// Append `?token=<T>` to every line ending in `extension`, minting a
/// fresh token per referenced resource. All other lines pass through
/// verbatim.
pub fn rewrite_playlist<F>(content: &str, extension: &str, mut token_for: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut rewritten: Vec<String> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('#') && trimmed.ends_with(extension) {
            rewritten.push(format!("{}?token={}", trimmed, token_for(trimmed)));
        } else {
            rewritten.push(line.to_string());
        }
    }

    let mut result = rewritten.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    result
}
