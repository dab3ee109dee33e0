//! Common test utilities.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use mentor_client::MentorClient;
use mentor_client::endpoint::{EndpointRegistry, Origin};
use mentor_client::retry::RetryPolicy;
use mentor_client::session::SessionStore;
use mentor_client::transport::ReqwestTransport;

pub const USER_JSON: &str = r#"{"id": "u1", "full_name": "Ana Souza", "email": "ana@example.com", "preferred_ai_provider": "openai", "tier": "free", "is_admin": false, "created_at": "2025-01-01T00:00:00Z"}"#;

/// Serve `app` on an ephemeral loopback port and return the port.
pub async fn serve(app: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

/// A loopback port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}/api/v1")
}

/// Registry pointing straight at `port`.
pub fn registry_for(port: u16) -> EndpointRegistry {
    EndpointRegistry::new(Some(base_url(port)), None)
}

/// Registry whose override is dead and whose same-origin fallback is `live_port`.
pub fn registry_with_fallback(dead_port: u16, live_port: u16) -> EndpointRegistry {
    EndpointRegistry::with_layout(
        Some(base_url(dead_port)),
        Some(Origin::new("http", "127.0.0.1")),
        live_port,
        "/api/v1",
    )
}

pub fn client_with(endpoints: EndpointRegistry, session: SessionStore) -> MentorClient {
    let transport = ReqwestTransport::new(Some(Duration::from_secs(5))).unwrap();
    MentorClient::new(
        endpoints,
        Arc::new(transport),
        session,
        RetryPolicy::from_millis(&[0, 10]),
    )
}

pub fn client_for(port: u16) -> MentorClient {
    client_with(registry_for(port), SessionStore::in_memory())
}
