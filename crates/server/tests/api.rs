//! API-level tests exercising the router end to end (no external encoder:
//! finalize paths covered here stop at the completeness precondition).

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use reelcap_common::config::AppConfig;
use reelcap_server::{build_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

const FRAME_LEN: usize = 4 * 2 * 4; // 4x2 RGBA

fn test_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage_root = dir.path().join("staging");
    config.publish.object_root = dir.path().join("objects");
    config.publish.public_base_url = "http://localhost:8787/objects".to_string();
    config.publish.metadata_log = dir.path().join("content.jsonl");
    // Any finalize that actually reaches the encoder fails fast instead of
    // depending on an installed ffmpeg.
    config.encoder.ffmpeg_path = Some("/nonexistent/ffmpeg-binary".into());

    let state = AppState::from_config(&config).unwrap();
    (build_router(state, 16 * 1024 * 1024), dir)
}

fn batch_uri(session: &str, batch_number: u64, start_frame: u64, frame_count: u32) -> String {
    format!(
        "/api/sessions/{session}/batches?batch_number={batch_number}&start_frame={start_frame}&frame_count={frame_count}&width=4&height=2"
    )
}

async fn post(app: &Router, uri: &str, body: Vec<u8>, content_type: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_batch(
    app: &Router,
    session: &str,
    batch_number: u64,
    start_frame: u64,
    frame_count: u32,
    payload: Vec<u8>,
) -> (StatusCode, serde_json::Value) {
    post(
        app,
        &batch_uri(session, batch_number, start_frame, frame_count),
        payload,
        "application/octet-stream",
    )
    .await
}

async fn post_finalize(
    app: &Router,
    session: &str,
    total_frames: u64,
) -> (StatusCode, serde_json::Value) {
    let request = serde_json::json!({
        "total_frames": total_frames,
        "fps": 30,
        "width": 4,
        "height": 2,
    });
    post(
        app,
        &format!("/api/sessions/{session}/finalize"),
        serde_json::to_vec(&request).unwrap(),
        "application/json",
    )
    .await
}

#[tokio::test(flavor = "multi_thread")]
async fn staging_a_batch_succeeds() {
    let (app, _dir) = test_app();
    let (status, body) = post_batch(&app, "abc123", 0, 0, 2, vec![1; 2 * FRAME_LEN]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["frames_staged"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_count_batch_is_a_noop_success() {
    let (app, _dir) = test_app();
    let (status, body) = post_batch(&app, "abc123", 0, 0, 0, Vec::new()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["frames_staged"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn truncated_payload_is_rejected_with_structured_error() {
    let (app, _dir) = test_app();
    let (status, body) = post_batch(&app, "abc123", 0, 0, 2, vec![1; 2 * FRAME_LEN - 3]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
    assert!(body["details"].as_str().unwrap().contains("bytes"));
}

#[tokio::test(flavor = "multi_thread")]
async fn hostile_session_ids_are_rejected() {
    let (app, _dir) = test_app();
    let (status, body) = post_batch(&app, "..%2Fetc", 0, 0, 0, Vec::new()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test(flavor = "multi_thread")]
async fn regressing_start_frames_are_rejected() {
    let (app, _dir) = test_app();
    post_batch(&app, "abc123", 1, 30, 1, vec![1; FRAME_LEN]).await;

    let (status, body) = post_batch(&app, "abc123", 0, 0, 1, vec![1; FRAME_LEN]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("backwards"));
}

#[tokio::test(flavor = "multi_thread")]
async fn finalize_with_a_gap_names_the_missing_frame() {
    let (app, _dir) = test_app();
    // Frames 0 and 2 staged, 1 missing.
    post_batch(&app, "abc123", 0, 0, 1, vec![1; FRAME_LEN]).await;
    post_batch(&app, "abc123", 1, 2, 1, vec![1; FRAME_LEN]).await;

    let (status, body) = post_finalize(&app, "abc123", 3).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Missing frame");
    assert!(body["details"].as_str().unwrap().contains('1'));
}

#[tokio::test(flavor = "multi_thread")]
async fn finalize_on_a_terminal_session_is_rejected_deterministically() {
    let (app, _dir) = test_app();
    post_batch(&app, "abc123", 0, 0, 1, vec![1; FRAME_LEN]).await;

    // First finalize fails (frame 1 missing) and the session goes terminal.
    let (first_status, _) = post_finalize(&app, "abc123", 2).await;
    assert_eq!(first_status, StatusCode::UNPROCESSABLE_ENTITY);

    // Every further finalize gets the same conflict, encoder untouched.
    for _ in 0..2 {
        let (status, body) = post_finalize(&app, "abc123", 2).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Session error");
    }

    // And the terminal session no longer accepts batches.
    let (status, _) = post_batch(&app, "abc123", 2, 60, 1, vec![1; FRAME_LEN]).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_finalize_request_does_not_consume_the_session() {
    let (app, _dir) = test_app();
    post_batch(&app, "abc123", 0, 0, 1, vec![1; FRAME_LEN]).await;

    let (status, _) = post_finalize(&app, "abc123", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The session is still collecting.
    let (status, _) = post_batch(&app, "abc123", 1, 1, 1, vec![1; FRAME_LEN]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_returns_a_receipt() {
    let (app, dir) = test_app();
    let (status, body) = post(
        &app,
        "/api/videos?owner=u1&file_name=clip.mp4",
        b"mp4 bytes".to_vec(),
        "video/mp4",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["size"], 9);
    assert_eq!(body["storage_path"], "users/u1/videos/clip.mp4");
    assert!(body["content_id"].as_str().unwrap().starts_with("vid-"));
    assert!(dir.path().join("objects/users/u1/videos/clip.mp4").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_publish_body_is_rejected() {
    let (app, _dir) = test_app();
    let (status, body) = post(
        &app,
        "/api/videos?owner=u1&file_name=clip.mp4",
        Vec::new(),
        "video/mp4",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation error");
}
