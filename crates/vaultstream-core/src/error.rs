//! Error types module
//!
//! All errors crossing a component boundary are unified under the
//! `AppError` enum. Each variant self-describes its HTTP presentation
//! through the `ErrorMetadata` trait so the HTTP layer stays a thin
//! translation at the edge.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "TOKEN_EXPIRED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Video not ready: status is {0}")]
    VideoNotReady(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("Passphrase required")]
    PassphraseRequired,

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token resource does not match request: {0}")]
    ResourceMismatch(String),

    #[error("Invalid playlist name: {0}")]
    InvalidPlaylist(String),

    #[error("Invalid segment name: {0}")]
    InvalidSegment(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable,
/// suggested_action, sensitive, log_level). client_message stays
/// per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::VideoNotFound(_) => (
            404,
            "VIDEO_NOT_FOUND",
            false,
            Some("Verify the video ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::VideoNotReady(_) => (
            409,
            "VIDEO_NOT_READY",
            true,
            Some("Wait for processing to finish and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::AccessDenied => (
            403,
            "ACCESS_DENIED",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::PassphraseRequired => (
            401,
            "PASSPHRASE_REQUIRED",
            false,
            Some("Resubmit the request with a passphrase"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidPassphrase => (
            401,
            "INVALID_PASSPHRASE",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidSignature => (
            403,
            "INVALID_SIGNATURE",
            false,
            Some("Request a fresh stream URL"),
            false,
            LogLevel::Debug,
        ),
        AppError::TokenExpired => (
            403,
            "TOKEN_EXPIRED",
            false,
            Some("Request a fresh stream URL"),
            false,
            LogLevel::Debug,
        ),
        AppError::ResourceMismatch(_) => (
            403,
            "RESOURCE_MISMATCH",
            false,
            Some("Request a fresh stream URL"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidPlaylist(_) => (
            404,
            "INVALID_PLAYLIST",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidSegment(_) => (
            404,
            "INVALID_SEGMENT",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce the file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the bearer token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::VideoNotFound(_) => "VideoNotFound",
            AppError::NotFound(_) => "NotFound",
            AppError::VideoNotReady(_) => "VideoNotReady",
            AppError::AccessDenied => "AccessDenied",
            AppError::PassphraseRequired => "PassphraseRequired",
            AppError::InvalidPassphrase => "InvalidPassphrase",
            AppError::InvalidSignature => "InvalidSignature",
            AppError::TokenExpired => "TokenExpired",
            AppError::ResourceMismatch(_) => "ResourceMismatch",
            AppError::InvalidPlaylist(_) => "InvalidPlaylist",
            AppError::InvalidSegment(_) => "InvalidSegment",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Storage(_) => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::VideoNotFound(_) => "Video not found".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::VideoNotReady(status) => {
                format!("Video is not ready for playback (status: {})", status)
            }
            AppError::AccessDenied => "Access denied".to_string(),
            AppError::PassphraseRequired => "A passphrase is required".to_string(),
            AppError::InvalidPassphrase => "Invalid passphrase".to_string(),
            AppError::InvalidSignature => "Invalid token".to_string(),
            AppError::TokenExpired => "Token has expired".to_string(),
            AppError::ResourceMismatch(_) => {
                "Token is not valid for the requested resource".to_string()
            }
            AppError::InvalidPlaylist(_) => "Playlist not found".to_string(),
            AppError::InvalidSegment(_) => "Segment not found".to_string(),
            AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_video_not_found() {
        let err = AppError::VideoNotFound("abc".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "VIDEO_NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Video not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_token_kinds() {
        assert_eq!(AppError::InvalidSignature.http_status_code(), 403);
        assert_eq!(AppError::InvalidSignature.error_code(), "INVALID_SIGNATURE");
        assert_eq!(AppError::TokenExpired.error_code(), "TOKEN_EXPIRED");
        assert_eq!(
            AppError::ResourceMismatch("720p.m3u8".to_string()).error_code(),
            "RESOURCE_MISMATCH"
        );
    }

    #[test]
    fn test_error_metadata_access_gate() {
        assert_eq!(AppError::PassphraseRequired.http_status_code(), 401);
        assert_eq!(AppError::InvalidPassphrase.http_status_code(), 401);
        assert_eq!(AppError::AccessDenied.http_status_code(), 403);
        assert_eq!(
            AppError::VideoNotReady("processing".to_string()).error_code(),
            "VIDEO_NOT_READY"
        );
    }

    #[test]
    fn test_storage_errors_hide_details() {
        let err = AppError::Storage("disk exploded at /var/lib".to_string());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access storage");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("inner failure");
        let err = AppError::InternalWithSource {
            message: "outer".to_string(),
            source,
        };
        let details = err.detailed_message();
        assert!(details.contains("Caused by: inner failure"));
    }
}
