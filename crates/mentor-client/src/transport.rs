//! HTTP transport seam.
//!
//! The executor and the streaming client only see [`HttpTransport`]. A
//! [`TransportError`] means no response was received at all (DNS failure,
//! refused connection, timeout); any HTTP status, including errors, is a
//! successful transport result.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use thiserror::Error;

pub use reqwest::Method;

/// Raw body chunks of a streaming response.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// No response was received.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

// ============================================================================
// Request / Response
// ============================================================================

/// A fully resolved request against one candidate.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

/// A buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A response whose body is consumed incrementally.
pub struct StreamingResponse {
    pub status: u16,
    /// `None` when the response carries no readable body.
    pub body: Option<ByteStream>,
}

impl StreamingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// Trait
// ============================================================================

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request and buffer the whole response body.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;

    /// Send a request and hand back the body as a byte stream.
    async fn open_stream(&self, request: ApiRequest) -> Result<StreamingResponse, TransportError>;
}

// ============================================================================
// reqwest implementation
// ============================================================================

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a transport. `timeout` of `None` keeps reqwest's defaults.
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(format!(
            "mentor-client/{}",
            crate::build_info::VERSION
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| TransportError(describe(&e)))?;
        Ok(Self { http })
    }

    /// Wrap an existing reqwest client.
    #[must_use]
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }

    fn build(&self, request: ApiRequest, accept: &'static str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, accept)
            .header(CACHE_CONTROL, "no-store");

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let response = self
            .build(request, "application/json")
            .send()
            .await
            .map_err(|e| TransportError(describe(&e)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(describe(&e)))?;

        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }

    async fn open_stream(&self, request: ApiRequest) -> Result<StreamingResponse, TransportError> {
        let response = self
            .build(request, "text/event-stream")
            .send()
            .await
            .map_err(|e| TransportError(describe(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map_err(|e| TransportError(describe(&e)));

        Ok(StreamingResponse {
            status,
            body: Some(Box::pin(body)),
        })
    }
}

/// Flatten a reqwest error and its sources into one line.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
