use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("No video stream found in source")]
    NoVideoStream,

    #[error("Encoder failed for {rendition}: {stderr}")]
    Encoder { rendition: String, stderr: String },

    #[error("Encoder timed out for {rendition} after {seconds}s")]
    EncoderTimeout { rendition: String, seconds: u64 },

    #[error("All renditions failed")]
    AllRenditionsFailed,

    #[error("Thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("Invalid encoder binary path: {0}")]
    InvalidBinaryPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
