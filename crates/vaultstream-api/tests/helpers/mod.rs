//! Test helpers: build the app against tempdir-backed local storage and
//! the in-memory repository, and seed ready-to-stream videos by writing an
//! HLS tree straight through the storage API.

use axum_test::TestServer;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use vaultstream_api::{auth, setup, state::AppState};
use vaultstream_core::models::{Video, VideoStatus, Visibility};
use vaultstream_core::{passphrase, Config};
use vaultstream_storage::keys;

pub const FAKE_SEGMENT: &[u8] = &[0x47, 0x1f, 0xff, 0x10, 0x00, 0x00, 0x00, 0x00];

/// Test application: server, shared state, and the storage tempdir.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let config = Config {
        local_storage_path: Some(
            temp_dir
                .path()
                .join("media")
                .to_string_lossy()
                .into_owned(),
        ),
        scratch_dir: temp_dir.path().join("scratch"),
        // Keep argon2 cheap in tests
        passphrase_time_cost: 1,
        ..Config::default()
    };

    let (state, router) = setup::initialize_app(config)
        .await
        .expect("Failed to initialize app");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

/// Bearer session token for a user, as the external account service would
/// mint it.
pub fn bearer_for(state: &AppState, user_id: Uuid) -> String {
    auth::mint_session(
        state.config.signing_secret_bytes(),
        user_id,
        Duration::from_secs(3600),
    )
}

pub struct SeedOptions {
    pub visibility: Visibility,
    pub passphrase: Option<&'static str>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            visibility: Visibility::Unlisted,
            passphrase: None,
        }
    }
}

fn video_record(id: Uuid, owner: Uuid, options: &SeedOptions, hash: Option<String>) -> Video {
    let now = Utc::now();
    Video {
        id,
        owner_user_id: owner,
        title: "bunny".to_string(),
        description: Some("a test clip".to_string()),
        visibility: options.visibility,
        passphrase_hash: hash,
        storage_path: keys::source_key(owner, id, "mp4"),
        hls_path: keys::hls_prefix(owner, id),
        master_playlist_path: None,
        duration: None,
        resolution: None,
        file_size: 1024,
        mime_type: "video/mp4".to_string(),
        original_filename: "bunny.mp4".to_string(),
        status: VideoStatus::Uploading,
        processing_error: None,
        views: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Insert a record that is still in `uploading` state.
pub async fn seed_uploading_video(state: &AppState, owner: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    state
        .videos
        .repository
        .insert(video_record(id, owner, &SeedOptions::default(), None))
        .await
        .expect("insert video");
    id
}

/// Insert a `ready` video backed by a two-variant HLS tree in storage.
pub async fn seed_ready_video(state: &AppState, owner: Uuid, options: SeedOptions) -> Uuid {
    let id = Uuid::new_v4();

    let hash = match options.passphrase {
        Some(p) => Some(
            passphrase::hash_passphrase(p, 1)
                .await
                .expect("hash passphrase"),
        ),
        None => None,
    };

    state
        .videos
        .repository
        .insert(video_record(id, owner, &options, hash))
        .await
        .expect("insert video");

    let storage = &state.videos.storage;
    let hls = keys::hls_prefix(owner, id);

    storage
        .upload(
            &keys::source_key(owner, id, "mp4"),
            b"original source bytes".to_vec(),
            "video/mp4",
        )
        .await
        .expect("upload source");

    let master = "#EXTM3U\n#EXT-X-VERSION:3\n\n\
        #EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720\n720p.m3u8\n\n\
        #EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\n360p.m3u8\n\n";
    storage
        .upload(
            &keys::hls_file(&hls, "master.m3u8"),
            master.as_bytes().to_vec(),
            "application/vnd.apple.mpegurl",
        )
        .await
        .expect("upload master");

    for variant in ["720p", "360p"] {
        let playlist = format!(
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n#EXT-X-MEDIA-SEQUENCE:0\n\
             #EXT-X-PLAYLIST-TYPE:VOD\n#EXTINF:4.000000,\n{v}_000.ts\n#EXTINF:2.500000,\n{v}_001.ts\n\
             #EXT-X-ENDLIST\n",
            v = variant
        );
        storage
            .upload(
                &keys::hls_file(&hls, &format!("{}.m3u8", variant)),
                playlist.into_bytes(),
                "application/vnd.apple.mpegurl",
            )
            .await
            .expect("upload variant playlist");

        for segment in ["000", "001"] {
            storage
                .upload(
                    &keys::hls_file(&hls, &format!("{}_{}.ts", variant, segment)),
                    FAKE_SEGMENT.to_vec(),
                    "video/MP2T",
                )
                .await
                .expect("upload segment");
        }
    }

    state
        .videos
        .repository
        .begin_processing(id)
        .await
        .expect("begin processing");
    state
        .videos
        .repository
        .mark_ready(id, keys::hls_file(&hls, "master.m3u8"))
        .await
        .expect("mark ready");

    id
}

/// Split a `path?token=...` stream URL into its path and token.
pub fn split_stream_url(url: &str) -> (String, String) {
    let (path, query) = url.split_once('?').expect("stream url has a query");
    let token = query
        .strip_prefix("token=")
        .expect("query is a token")
        .to_string();
    (path.to_string(), token)
}
