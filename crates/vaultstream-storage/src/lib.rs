//! VaultStream storage library
//!
//! Blob storage abstraction and implementations. The [`Storage`] trait
//! splits buffered reads (manifests) from streamed reads (segments) and
//! exposes `resolve` so the transcoder can hand the encoder a real local
//! path regardless of backend.
//!
//! # Key format
//!
//! Forward-slash-separated relative keys, laid out as
//! `videos/{owner_user_id}/{video_id}/original{.ext}` for source blobs and
//! `videos/{owner_user_id}/{video_id}/hls/...` for the transcoded tree.
//! Keys must not contain `..` or a leading `/`; generation is centralized
//! in the `keys` module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
pub use vaultstream_core::StorageBackend;
