pub mod video;

pub use crate::storage_types::StorageBackend;
pub use video::{PlaybackGrant, Resolution, Video, VideoResponse, VideoStatus, Visibility};
