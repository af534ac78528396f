//! Router-level tests driven in-process with `tower::ServiceExt::oneshot`.
//!
//! The extractor is wired to a nonexistent tool path: synchronous
//! validation runs before the availability probe, so rejection paths are
//! exercised without the real tool installed.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use ytclip_core::Extractor;
use ytclip_server::{build_router, AppState};

fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Extractor::builder(dir.path().join("no-such-tool"), dir.path().join("media"))
        .build();
    (build_router(AppState::new(extractor)), dir)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_invalid_hour_is_rejected_synchronously() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(post_json(
            "/api/extract",
            json!({
                "url": "https://example.com/watch?v=abc",
                "startTime": "25:00:00",
                "endTime": "26:00:00",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_INPUT");
    assert!(body.get("jobId").is_none());
}

#[tokio::test]
async fn test_unpaired_bounds_are_rejected() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(post_json(
            "/api/extract",
            json!({
                "url": "https://example.com/watch?v=abc",
                "startTime": "00:10:00",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_missing_url_is_rejected() {
    let (app, _dir) = test_app();

    let response = app.oneshot(post_json("/api/extract", json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_missing_tool_yields_service_unavailable() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(post_json(
            "/api/extract",
            json!({ "url": "https://example.com/watch?v=abc" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["code"], "TOOL_UNAVAILABLE");
}

#[tokio::test]
async fn test_convert_alias_accepts_query_parameters() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/convert?url=https://example.com/watch?v=abc&start=99:00:00&end=99:00:05")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_jobs_listing_starts_empty() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(Request::builder().uri("/api/jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/jobs/{}", uuid::Uuid::now_v7()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_status_reports_tool_and_features() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["tool"]["available"], false);
    assert_eq!(body["relay"], false);
    assert_eq!(body["catalog"], false);
    assert_eq!(body["activeJobs"], 0);
}

#[tokio::test]
async fn test_recordings_require_catalog_configuration() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/recordings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["code"], "CATALOG_UNCONFIGURED");
}

#[tokio::test]
async fn test_files_listing_is_empty_without_media_dir() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(Request::builder().uri("/api/files").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_files_listing_reports_produced_artifacts() {
    let (app, dir) = test_app();
    let media = dir.path().join("media");
    std::fs::create_dir_all(&media).unwrap();
    std::fs::write(media.join("a.mp3"), b"mp3").unwrap();
    std::fs::write(media.join("notes.txt"), b"ignored").unwrap();

    let response = app
        .oneshot(Request::builder().uri("/api/files").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let files = body.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "a.mp3");
    assert_eq!(files[0]["size"], 3);
    assert_eq!(files[0]["url"], "/media/a.mp3");
}

#[tokio::test]
async fn test_progress_endpoint_is_an_event_stream() {
    let (app, _dir) = test_app();

    // The body stays open for live events; only the handshake is checked
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/progress/{}", uuid::Uuid::now_v7()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}
