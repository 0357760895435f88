use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use upload_finalizer::config::FinalizerConfig;
use upload_finalizer::services::finalizer::FinalizerService;
use upload_finalizer::services::usage::NoOpNotifier;
use upload_finalizer::{AppState, create_app};

struct TestApp {
    state: AppState,
    _staging: TempDir,
    store: TempDir,
}

fn test_app() -> TestApp {
    let staging = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let config = FinalizerConfig {
        staging_dir: staging.path().to_path_buf(),
        storage_root: store.path().to_path_buf(),
        ..FinalizerConfig::development()
    };
    let finalizer = Arc::new(FinalizerService::new(config.clone(), Arc::new(NoOpNotifier)));
    TestApp {
        state: AppState { finalizer, config },
        _staging: staging,
        store,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for_placement(app: &TestApp, relative: &str) -> std::path::PathBuf {
    let placed = app.store.path().join(relative);
    for _ in 0..200 {
        if placed.exists() {
            return placed;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{relative} was never placed");
}

#[tokio::test]
async fn test_hook_places_staged_upload() {
    let app = test_app();
    std::fs::write(app.state.config.blob_path("hook-1"), b"hook payload").unwrap();

    let response = create_app(app.state.clone())
        .oneshot(post_json(
            "/hooks/upload-complete",
            json!({
                "id": "hook-1",
                "size": 12,
                "metadata": { "filename": "payload.txt", "relativePath": "inbox%2Fpayload.txt" }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["accepted"], json!(true));

    let placed = wait_for_placement(&app, "inbox/payload.txt").await;
    assert_eq!(std::fs::read(placed).unwrap(), b"hook payload");
}

#[tokio::test]
async fn test_hook_accepts_wire_metadata_header() {
    let app = test_app();
    std::fs::write(app.state.config.blob_path("hook-2"), b"wire bytes").unwrap();

    // filename "notes.txt", relativePath "archive%2Fnotes.txt", base64-encoded
    let response = create_app(app.state.clone())
        .oneshot(post_json(
            "/hooks/upload-complete",
            json!({
                "id": "hook-2",
                "size": 10,
                "uploadMetadata":
                    "filename bm90ZXMudHh0,relativePath YXJjaGl2ZSUyRm5vdGVzLnR4dA=="
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_for_placement(&app, "archive/notes.txt").await;
}

#[tokio::test]
async fn test_duplicate_hook_delivery_is_rejected() {
    let app = test_app();
    std::fs::write(app.state.config.blob_path("hook-3"), b"once only").unwrap();

    let request = json!({
        "id": "hook-3",
        "size": 9,
        "metadata": { "filename": "once.txt" }
    });

    // At-least-once delivery: a duplicate lands while the first is still in
    // flight. Pin the id in the registry to model the in-flight window.
    let guard = app.state.finalizer.registry().try_claim("hook-3").unwrap();

    let app_router = create_app(app.state.clone());
    let duplicate = app_router
        .clone()
        .oneshot(post_json("/hooks/upload-complete", request.clone()))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::ACCEPTED);
    let body = duplicate.into_body().collect().await.unwrap().to_bytes();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["accepted"], json!(false));

    // Nothing was placed while the duplicate was collapsing
    assert!(app.state.config.blob_path("hook-3").exists());

    drop(guard);
    let retry = app_router
        .oneshot(post_json("/hooks/upload-complete", request))
        .await
        .unwrap();
    assert_eq!(retry.status(), StatusCode::ACCEPTED);
    let body = retry.into_body().collect().await.unwrap().to_bytes();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["accepted"], json!(true));

    wait_for_placement(&app, "once.txt").await;
}

#[tokio::test]
async fn test_health_reports_staging_state() {
    let app = test_app();

    let response = create_app(app.state.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["status"], json!("ok"));
    assert_eq!(parsed["staging"], json!("accessible"));
    assert_eq!(parsed["in_flight"], json!(0));
}
