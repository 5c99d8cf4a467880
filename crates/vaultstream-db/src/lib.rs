//! Video record repository
//!
//! The record store is an external collaborator; everything the service
//! needs from it is captured by the [`VideoRepository`] trait. The in-memory
//! implementation backs the default wiring and the test suite; a deployment
//! implements the same trait over its document store.
//!
//! Status transitions are guarded here so a record can never regress out of
//! a terminal state, regardless of task interleaving.

pub mod memory;
pub mod repository;

pub use memory::MemoryVideoRepository;
pub use repository::{RepoError, RepoResult, VideoPatch, VideoRepository};
