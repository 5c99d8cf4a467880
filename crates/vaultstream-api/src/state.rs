//! Application state.
//!
//! The storage backend and repository are chosen once at startup and
//! injected everywhere as trait objects; nothing reaches for globals.

use std::sync::Arc;

use vaultstream_core::Config;
use vaultstream_db::VideoRepository;
use vaultstream_processing::VideoPipeline;
use vaultstream_storage::Storage;

use crate::token::StreamSigner;

/// Video persistence, blob storage, and the transcoding pipeline.
#[derive(Clone)]
pub struct VideoState {
    pub repository: Arc<dyn VideoRepository>,
    pub storage: Arc<dyn Storage>,
    pub pipeline: Arc<VideoPipeline>,
}

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub videos: VideoState,
    pub signer: StreamSigner,
    pub config: Config,
}

impl axum::extract::FromRef<Arc<AppState>> for VideoState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.videos.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
