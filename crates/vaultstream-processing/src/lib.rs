//! VaultStream processing library
//!
//! The transcoding side of the service: source probing, quality-ladder
//! derivation, the ffmpeg HLS driver, and the pipeline orchestrator that
//! walks a video through `uploading -> processing -> ready | failed`.

pub mod error;
pub mod ladder;
pub mod pipeline;
pub mod probe;
pub mod transcoder;

pub use error::TranscodeError;
pub use ladder::{derive_ladder, Rendition};
pub use pipeline::VideoPipeline;
pub use probe::SourceProbe;
pub use transcoder::FfmpegTranscoder;
