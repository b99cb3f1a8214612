//! End-to-end integration tests for the easylock HTTP API.
//!
//! Tests exercise the full stack: HTTP request -> axum router -> handler ->
//! LockService -> resolver -> HTTP response.
//!
//! Each test builds a fresh AppState with its own shutdown token and sends
//! requests with `tower::ServiceExt::oneshot`, without starting a network
//! server.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use easylock_server::router::build_router;
use easylock_server::state::AppState;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn test_app() -> (Router, CancellationToken) {
    let shutdown = CancellationToken::new();
    let state = AppState::new(shutdown.clone());
    (build_router(state), shutdown)
}

fn lock_body(key: &str, app: &str, kind: &str) -> serde_json::Value {
    json!({
        "key": key,
        "identity": 1,
        "application": app,
        "thread": "main",
        "kind": kind,
    })
}

fn timed_body(key: &str, app: &str, seconds: i64) -> serde_json::Value {
    json!({
        "key": key,
        "identity": 1,
        "application": app,
        "thread": "main",
        "kind": "timeout",
        "duration": { "magnitude": seconds, "unit": "seconds" },
    })
}

fn post_request(path: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or(json!(null));
    (status, json)
}

/// Sends a POST request with a JSON body and returns (status, json).
async fn post_json(
    app: &Router,
    path: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(post_request(path, &body))
        .await
        .unwrap();
    read_json(response).await
}

/// Sends a GET request and returns (status, json).
async fn get_json(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

/// Polls `GET /locks` until `key` reports `expected` blocked callers.
async fn wait_for_waiting(app: &Router, key: &str, expected: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, body) = get_json(app, "/locks").await;
            let waiting = body["locks"]
                .as_array()
                .and_then(|locks| locks.iter().find(|l| l["key"] == key))
                .and_then(|l| l["waiting"].as_u64())
                .unwrap_or(0);
            if waiting == expected {
                return;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("waiter never queued");
}

// ---------------------------------------------------------------------------
// Lock operations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_try_lock_then_contention_then_unlock() {
    let (app, _shutdown) = test_app();

    let (status, body) =
        post_json(&app, "/locks/try-lock", lock_body("orders", "app1", "simple")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["cause"], "succeeded");
    assert_eq!(body["operation"], "try_lock");
    assert_eq!(body["key"], "orders");

    let (status, body) =
        post_json(&app, "/locks/try-lock", lock_body("orders", "app2", "simple")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["cause"], "already_locked");

    let (_, body) = post_json(&app, "/locks/unlock", lock_body("orders", "app2", "simple")).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["cause"], "not_held");

    let (_, body) = post_json(&app, "/locks/unlock", lock_body("orders", "app1", "simple")).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["operation"], "unlock");

    let (_, body) =
        post_json(&app, "/locks/try-lock", lock_body("orders", "app2", "simple")).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_blocking_lock_is_handed_off_on_unlock() {
    let (app, _shutdown) = test_app();

    let (_, body) = post_json(&app, "/locks/lock", lock_body("batch", "app1", "simple")).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["operation"], "lock");

    let blocked = tokio::spawn(
        app.clone()
            .oneshot(post_request("/locks/lock", &lock_body("batch", "app2", "simple"))),
    );
    wait_for_waiting(&app, "batch", 1).await;

    let (_, body) = post_json(&app, "/locks/unlock", lock_body("batch", "app1", "simple")).await;
    assert_eq!(body["success"], true);

    let (status, body) = read_json(blocked.await.unwrap().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = get_json(&app, "/locks").await;
    assert_eq!(body["locks"][0]["application"], "app2");
    assert_eq!(body["locks"][0]["waiting"], 0);
}

#[tokio::test]
async fn test_reentrant_lock_over_http() {
    let (app, _shutdown) = test_app();

    for _ in 0..2 {
        let (_, body) =
            post_json(&app, "/locks/lock", lock_body("ledger", "app1", "reentrant")).await;
        assert_eq!(body["success"], true);
    }

    let (_, body) = get_json(&app, "/locks").await;
    assert_eq!(body["locks"][0]["kind"], "reentrant");
    assert_eq!(body["locks"][0]["holds"], 2);

    let (_, body) =
        post_json(&app, "/locks/unlock", lock_body("ledger", "app1", "reentrant")).await;
    assert_eq!(body["success"], true);
    let (_, body) =
        post_json(&app, "/locks/try-lock", lock_body("ledger", "app2", "reentrant")).await;
    assert_eq!(body["cause"], "already_locked");

    post_json(&app, "/locks/unlock", lock_body("ledger", "app1", "reentrant")).await;
    let (_, body) = get_json(&app, "/locks").await;
    assert_eq!(body["locks"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_timeout_lock_reports_expiry() {
    let (app, _shutdown) = test_app();

    let (_, body) = post_json(&app, "/locks/lock", timed_body("session", "app1", 60)).await;
    assert_eq!(body["success"], true);

    let (_, body) = get_json(&app, "/locks").await;
    let entry = &body["locks"][0];
    assert_eq!(entry["kind"], "timeout");
    let expires_in = entry["expires_in_ms"].as_u64().unwrap();
    assert!(expires_in > 50_000 && expires_in <= 60_000);

    let (_, body) = get_json(&app, "/health").await;
    assert_eq!(body["pending_expiries"], 1);
}

#[tokio::test]
async fn test_unlock_after_expiry_reports_lock_expired() {
    let (app, _shutdown) = test_app();

    let body = json!({
        "key": "short",
        "identity": 1,
        "application": "app1",
        "thread": "main",
        "kind": "timeout",
        "duration": { "magnitude": 20, "unit": "milliseconds" },
    });
    let (_, resp) = post_json(&app, "/locks/lock", body.clone()).await;
    assert_eq!(resp["success"], true);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, status) = get_json(&app, "/locks").await;
            if status["locks"].as_array().unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("lock never expired");

    let (status, resp) = post_json(&app, "/locks/unlock", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["success"], false);
    assert_eq!(resp["cause"], "lock_expired");
}

#[tokio::test]
async fn test_timeout_unlock_without_duration_releases() {
    let (app, _shutdown) = test_app();

    let (_, body) = post_json(&app, "/locks/lock", timed_body("report", "app1", 60)).await;
    assert_eq!(body["success"], true);

    let (status, body) =
        post_json(&app, "/locks/unlock", lock_body("report", "app1", "timeout")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["cause"], "succeeded");

    let (_, body) = get_json(&app, "/locks").await;
    assert_eq!(body["locks"].as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_empty_key_is_bad_request() {
    let (app, _shutdown) = test_app();

    let (status, body) =
        post_json(&app, "/locks/try-lock", lock_body("   ", "app1", "simple")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_timeout_without_duration_is_bad_request() {
    let (app, _shutdown) = test_app();

    let (status, body) =
        post_json(&app, "/locks/lock", lock_body("session", "app1", "timeout")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("session"));

    let (_, body) = get_json(&app, "/locks").await;
    assert_eq!(body["locks"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_kind_is_rejected() {
    let (app, _shutdown) = test_app();

    let (status, _) =
        post_json(&app, "/locks/try-lock", lock_body("orders", "app1", "fair")).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_shutdown_fails_blocked_lock() {
    let (app, shutdown) = test_app();

    post_json(&app, "/locks/lock", lock_body("job", "app1", "simple")).await;
    let blocked = tokio::spawn(
        app.clone()
            .oneshot(post_request("/locks/lock", &lock_body("job", "app2", "simple"))),
    );
    wait_for_waiting(&app, "job", 1).await;

    shutdown.cancel();

    let (status, body) = read_json(blocked.await.unwrap().unwrap()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");

    let (_, body) = get_json(&app, "/locks").await;
    assert_eq!(body["locks"][0]["application"], "app1");
    assert_eq!(body["locks"][0]["waiting"], 0);
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_reaper_state() {
    let (app, shutdown) = test_app();

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["held_locks"], 0);

    post_json(&app, "/locks/try-lock", lock_body("a", "app1", "simple")).await;
    post_json(&app, "/locks/try-lock", lock_body("a", "app1", "reentrant")).await;
    let (_, body) = get_json(&app, "/health").await;
    assert_eq!(body["held_locks"], 2);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, body) = get_json(&app, "/health").await;
            if body["status"] == "degraded" {
                return;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("reaper never stopped");
}
