mod helpers;

use axum::http::StatusCode;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use helpers::{
    seed_ready_video, seed_uploading_video, setup_test_app, split_stream_url, SeedOptions,
    FAKE_SEGMENT,
};

async fn granted_master_url(app: &helpers::TestApp, id: Uuid) -> (String, String) {
    let response = app.server.post(&format!("/api/videos/{}/access", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    split_stream_url(body["stream_url"].as_str().unwrap())
}

#[tokio::test]
async fn test_master_variant_segment_walk() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    // Master playlist: every variant line carries its own token.
    let (master_path, master_token) = granted_master_url(&app, id).await;
    let master = app
        .server
        .get(&master_path)
        .add_query_param("token", &master_token)
        .await;
    assert_eq!(master.status_code(), StatusCode::OK);
    assert_eq!(
        master.headers().get("content-type").unwrap(),
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(master.headers().get("cache-control").unwrap(), "no-cache");

    let master_text = master.text();
    assert_eq!(master_text.matches("#EXT-X-STREAM-INF").count(), 2);
    let variant_lines: Vec<&str> = master_text
        .lines()
        .filter(|l| !l.starts_with('#') && l.contains(".m3u8"))
        .collect();
    assert_eq!(variant_lines.len(), 2);
    for line in &variant_lines {
        assert!(line.contains("?token="), "variant line missing token: {}", line);
    }

    // Variant playlist: every segment line carries a token.
    let (variant_file, variant_token) = variant_lines[0].split_once("?token=").unwrap();
    let variant = app
        .server
        .get(&format!("/api/stream/{}/{}", id, variant_file))
        .add_query_param("token", variant_token)
        .await;
    assert_eq!(variant.status_code(), StatusCode::OK);
    let variant_text = variant.text();
    let segment_lines: Vec<&str> = variant_text
        .lines()
        .filter(|l| !l.starts_with('#') && l.contains(".ts"))
        .collect();
    assert_eq!(segment_lines.len(), 2);
    for line in &segment_lines {
        assert!(line.contains("?token="), "segment line missing token: {}", line);
    }
    assert!(variant_text.contains("#EXT-X-ENDLIST"));

    // Segment: streamed bytes with the immutable cache policy.
    let (segment_file, segment_token) = segment_lines[0].split_once("?token=").unwrap();
    let segment = app
        .server
        .get(&format!("/api/stream/{}/{}", id, segment_file))
        .add_query_param("token", segment_token)
        .await;
    assert_eq!(segment.status_code(), StatusCode::OK);
    assert_eq!(
        segment.headers().get("content-type").unwrap(),
        "video/MP2T"
    );
    assert_eq!(
        segment.headers().get("cache-control").unwrap(),
        "public, max-age=31536000"
    );
    assert_eq!(segment.as_bytes().as_ref(), FAKE_SEGMENT);
}

#[tokio::test]
async fn test_missing_token_is_refused() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    let response = app
        .server
        .get(&format!("/api/stream/{}/master.m3u8", id))
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn test_token_for_other_resource_is_refused() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    let (_, master_token) = granted_master_url(&app, id).await;

    let response = app
        .server
        .get(&format!("/api/stream/{}/720p.m3u8", id))
        .add_query_param("token", &master_token)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "RESOURCE_MISMATCH");
}

#[tokio::test]
async fn test_token_for_other_video_is_refused() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    let token = app
        .state
        .signer
        .mint(Uuid::new_v4(), "master.m3u8", None, None);

    let response = app
        .server
        .get(&format!("/api/stream/{}/master.m3u8", id))
        .add_query_param("token", &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "RESOURCE_MISMATCH");
}

#[tokio::test]
async fn test_tampered_token_is_refused() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    let (path, token) = granted_master_url(&app, id).await;
    let mut tampered = token.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let response = app
        .server
        .get(&path)
        .add_query_param("token", &tampered)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn test_expired_token_is_refused() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    let token = app
        .state
        .signer
        .mint(id, "master.m3u8", None, Some(Duration::ZERO));
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let response = app
        .server
        .get(&format!("/api/stream/{}/master.m3u8", id))
        .add_query_param("token", &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_stream_refused_until_ready() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_uploading_video(&app.state, owner).await;

    // Even a validly signed token cannot play a video that is not ready.
    let token = app.state.signer.mint(id, "master.m3u8", None, None);
    let response = app
        .server
        .get(&format!("/api/stream/{}/master.m3u8", id))
        .add_query_param("token", &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unproduced_variant_is_404() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    // The seeded ladder stops at 720p; 1080p was never produced.
    let token = app.state.signer.mint(id, "1080p.m3u8", None, None);
    let response = app
        .server
        .get(&format!("/api/stream/{}/1080p.m3u8", id))
        .add_query_param("token", &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_filenames_are_refused() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    let playlist = app
        .server
        .get(&format!("/api/stream/{}/bad$name.m3u8", id))
        .await;
    assert_eq!(playlist.status_code(), StatusCode::NOT_FOUND);
    let body: Value = playlist.json();
    assert_eq!(body["code"], "INVALID_PLAYLIST");

    let other = app
        .server
        .get(&format!("/api/stream/{}/notes.txt", id))
        .await;
    assert_eq!(other.status_code(), StatusCode::NOT_FOUND);
    let body: Value = other.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_missing_segment_is_404() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let id = seed_ready_video(&app.state, owner, SeedOptions::default()).await;

    let token = app.state.signer.mint(id, "720p_999.ts", None, None);
    let response = app
        .server
        .get(&format!("/api/stream/{}/720p_999.ts", id))
        .add_query_param("token", &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
