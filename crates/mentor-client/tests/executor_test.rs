//! Integration tests for request execution against a live HTTP server.
//!
//! Covers failover across candidates, the refresh-and-retry cycle and error
//! mapping through the real reqwest transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use mentor_client::ClientError;
use mentor_client::session::{FileSessionPersistence, Session, SessionPersistence, SessionStore};

mod common;
use common::{USER_JSON, client_for, client_with, closed_port, registry_for, serve};

// ============================================================================
// Fake backend
// ============================================================================

#[derive(Default)]
struct Backend {
    /// Access token currently accepted by `/auth/me`.
    valid_access: &'static str,
    /// Whether `/auth/refresh` accepts `r1`.
    refresh_works: bool,
    refresh_calls: AtomicUsize,
    me_calls: AtomicUsize,
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    backend.me_calls.fetch_add(1, Ordering::SeqCst);
    if bearer(&headers) == Some(backend.valid_access) {
        let user: Value = serde_json::from_str(USER_JSON).unwrap();
        return Json(user).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "token expired"})),
    )
        .into_response()
}

async fn refresh(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if backend.refresh_works && body["refresh_token"] == "r1" {
        return Json(json!({
            "access_token": backend.valid_access,
            "refresh_token": "r2",
            "token_type": "bearer",
        }))
        .into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "invalid refresh token"})),
    )
        .into_response()
}

fn auth_app(backend: Arc<Backend>) -> Router {
    Router::new()
        .route("/api/v1/auth/me", get(me))
        .route("/api/v1/auth/refresh", post(refresh))
        .with_state(backend)
}

// ============================================================================
// Failover
// ============================================================================

#[tokio::test]
async fn fails_over_to_same_origin_fallback() {
    let backend = Arc::new(Backend {
        valid_access: "a1",
        ..Backend::default()
    });
    let live = serve(auth_app(backend.clone())).await;
    let dead = closed_port();

    let session = SessionStore::in_memory();
    session.set_tokens("a1", "r1").await;
    let client = client_with(common::registry_with_fallback(dead, live), session);

    let user = client.me().await.unwrap();

    assert_eq!(user.email, "ana@example.com");
    assert_eq!(backend.me_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_everywhere_names_last_candidate() {
    let dead = closed_port();
    let client = client_for(dead);

    let err = client.me().await.unwrap_err();

    match err {
        ClientError::NetworkUnreachable { url, .. } => {
            assert_eq!(url, format!("http://localhost:{dead}/api/v1/auth/me"));
        }
        other => panic!("expected NetworkUnreachable, got {other:?}"),
    }
}

// ============================================================================
// Refresh cycle
// ============================================================================

#[tokio::test]
async fn expired_token_is_refreshed_and_call_retried() {
    let backend = Arc::new(Backend {
        valid_access: "fresh",
        refresh_works: true,
        ..Backend::default()
    });
    let port = serve(auth_app(backend.clone())).await;

    let session = SessionStore::in_memory();
    session.set_tokens("stale", "r1").await;
    let client = client_with(registry_for(port), session.clone());

    let user = client.me().await.unwrap();

    assert_eq!(user.full_name, "Ana Souza");
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.me_calls.load(Ordering::SeqCst), 2);
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.access_token.as_deref(), Some("fresh"));
    assert_eq!(snapshot.refresh_token.as_deref(), Some("r2"));
}

#[tokio::test]
async fn failed_refresh_logs_out_and_persists_empty_record() {
    let backend = Arc::new(Backend {
        valid_access: "fresh",
        refresh_works: false,
        ..Backend::default()
    });
    let port = serve(auth_app(backend.clone())).await;

    let dir = tempfile::TempDir::new().unwrap();
    let persistence = Arc::new(FileSessionPersistence::new(dir.path().join("session.json")));
    let session = SessionStore::open(persistence.clone());
    session.set_tokens("stale", "r1").await;
    let client = client_with(registry_for(port), session.clone());

    let err = client.me().await.unwrap_err();

    assert!(err.is_auth_expired());
    assert_eq!(err.to_string(), "session expired, please log in again");
    assert_eq!(session.snapshot().await, Session::default());
    assert_eq!(persistence.load().unwrap(), Some(Session::default()));
    assert!(backend.refresh_calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn concurrent_expired_calls_share_one_refresh() {
    let backend = Arc::new(Backend {
        valid_access: "fresh",
        refresh_works: true,
        ..Backend::default()
    });
    let port = serve(auth_app(backend.clone())).await;

    let session = SessionStore::in_memory();
    session.set_tokens("stale", "r1").await;
    let client = client_with(registry_for(port), session);

    let (first, second) = tokio::join!(client.me(), client.me());

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Error mapping
// ============================================================================

async fn register_conflict() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"detail": "email already registered"})),
    )
        .into_response()
}

async fn plain_failure() -> Response {
    (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response()
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[tokio::test]
async fn server_detail_is_surfaced_verbatim() {
    let app = Router::new().route("/api/v1/auth/register", post(register_conflict));
    let port = serve(app).await;
    let client = client_for(port);

    let err = client
        .register("Ana", "ana@example.com", "secret")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "email already registered");
}

#[tokio::test]
async fn non_json_error_uses_raw_text() {
    let app = Router::new().route("/api/v1/providers/status", get(plain_failure));
    let port = serve(app).await;
    let client = client_for(port);

    let err = client.provider_status().await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.to_string(), "upstream unavailable");
}

#[tokio::test]
async fn delete_accepts_no_content() {
    let app = Router::new().route("/api/v1/sessions/{id}", delete(no_content));
    let port = serve(app).await;
    let client = client_for(port);

    client.delete_session("s1").await.unwrap();
}
