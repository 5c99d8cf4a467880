//! VaultStream core library
//!
//! Shared foundation for the VaultStream services: configuration, the
//! application error taxonomy, domain models, and passphrase hashing.

pub mod config;
pub mod error;
pub mod models;
pub mod passphrase;
pub mod storage_types;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
