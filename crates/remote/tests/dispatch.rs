//! Integration tests for readiness-gated dispatch against a live
//! loopback service.

mod common;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde_json::{json, Value};
use waypoint_remote::{dispatch, DispatchError, HealthConfig, HealthError};

/// What the mock worker observed about the dispatch request.
#[derive(Clone, Default)]
struct Observed {
    payload: Arc<Mutex<Option<Value>>>,
    auth: Arc<Mutex<Option<String>>>,
    posted: Arc<AtomicBool>,
}

async fn healthy() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn accept(
    State(observed): State<Observed>,
    headers: axum::http::HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    observed.posted.store(true, Ordering::SeqCst);
    *observed.auth.lock().expect("auth lock") = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    *observed.payload.lock().expect("payload lock") = Some(body);
    (StatusCode::OK, "accepted".to_string())
}

fn fast_config() -> HealthConfig {
    HealthConfig {
        wait_budget: Duration::from_millis(2_000),
        poll_interval: Duration::from_millis(50),
        ..Default::default()
    }
}

fn write_payload_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(contents).expect("write payload");
    f
}

#[tokio::test]
async fn dispatch_sends_encoded_file_with_headers() {
    let observed = Observed::default();
    let app = Router::new()
        .route("/", post(accept))
        .route("/health", get(healthy))
        .with_state(observed.clone());
    let base = common::spawn_app(app).await;

    let file = write_payload_file(b"hello world");
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        "Bearer test-token".parse().expect("header value"),
    );

    let body = dispatch(
        file.path().to_str().expect("path"),
        &base,
        &headers,
        None,
        &fast_config(),
    )
    .await
    .expect("dispatch");

    assert_eq!(body, "accepted");

    let payload = observed
        .payload
        .lock()
        .expect("payload lock")
        .take()
        .expect("worker received a payload");
    let encoded = payload["file_bytes"].as_str().expect("file_bytes string");
    assert_eq!(STANDARD.decode(encoded).expect("valid base64"), b"hello world");

    let auth = observed.auth.lock().expect("auth lock").take();
    assert_eq!(auth.as_deref(), Some("Bearer test-token"));
}

#[tokio::test]
async fn no_post_is_issued_when_gate_never_succeeds() {
    let observed = Observed::default();
    let app = Router::new()
        .route("/", post(accept))
        .route(
            "/health",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
        )
        .with_state(observed.clone());
    let base = common::spawn_app(app).await;

    let file = write_payload_file(b"payload");
    let config = HealthConfig {
        wait_budget: Duration::from_millis(200),
        poll_interval: Duration::from_millis(50),
        ..Default::default()
    };

    let result = dispatch(
        file.path().to_str().expect("path"),
        &base,
        &HeaderMap::new(),
        None,
        &config,
    )
    .await;

    assert_matches!(
        result,
        Err(DispatchError::NotReady(HealthError::Timeout { .. }))
    );
    assert!(
        !observed.posted.load(Ordering::SeqCst),
        "the payload POST must never be issued before the gate succeeds"
    );
}

#[tokio::test]
async fn remote_error_body_is_passed_through() {
    let app = Router::new()
        .route(
            "/",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "bad payload shape") }),
        )
        .route("/health", get(healthy));
    let base = common::spawn_app(app).await;

    let file = write_payload_file(b"payload");
    let result = dispatch(
        file.path().to_str().expect("path"),
        &base,
        &HeaderMap::new(),
        None,
        &fast_config(),
    )
    .await;

    assert_matches!(result, Err(DispatchError::Remote { status: 422, ref body }) => {
        assert!(body.contains("bad payload shape"));
    });
}

#[tokio::test]
async fn missing_payload_file_fails_before_any_network_io() {
    let result = dispatch(
        "/nonexistent/payload.bin",
        "http://127.0.0.1:9/",
        &HeaderMap::new(),
        None,
        &fast_config(),
    )
    .await;

    assert_matches!(result, Err(DispatchError::Io(_)));
}
