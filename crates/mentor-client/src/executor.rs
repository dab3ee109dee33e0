//! Resilient request execution.
//!
//! A call walks the candidate × attempt matrix until any HTTP response
//! arrives, then runs at most one refresh cycle if that response was a 401
//! to an authenticated call:
//!
//! ```text
//! Attempting --401 + bearer--> Refreshing --new token--> Retrying --> Done
//!     |                            |                         |
//!     +--> Done / Failed           +--> Failed(AuthExpired)  +--> Failed
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::endpoint::EndpointRegistry;
use crate::error::{ClientError, Result};
use crate::refresh::Reauthenticator;
use crate::retry::{RequestAttempt, RetryPolicy};
use crate::session::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method};

const UNAUTHORIZED: u16 = 401;

/// Phases of a single call.
#[derive(Debug)]
enum Phase {
    Attempting,
    Refreshing { url: String },
    Retrying { url: String, token: String },
    Done(ApiResponse),
    Failed(ClientError),
}

/// The parts of a call that stay fixed across attempts.
struct Call<'a> {
    method: Method,
    path: &'a str,
    body: Option<serde_json::Value>,
    bearer: Option<String>,
}

impl Call<'_> {
    fn request(&self, url: String, bearer: Option<String>) -> ApiRequest {
        ApiRequest {
            method: self.method.clone(),
            url,
            body: self.body.clone(),
            bearer,
        }
    }
}

/// Executes JSON requests with retry, failover and one refresh cycle.
#[derive(Clone)]
pub struct RequestExecutor {
    endpoints: EndpointRegistry,
    transport: Arc<dyn HttpTransport>,
    session: SessionStore,
    reauth: Reauthenticator,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(
        endpoints: EndpointRegistry,
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
        policy: RetryPolicy,
    ) -> Self {
        let reauth = Reauthenticator::new(endpoints.clone(), transport.clone(), session.clone());
        Self {
            endpoints,
            transport,
            session,
            reauth,
            policy,
        }
    }

    pub fn reauthenticator(&self) -> &Reauthenticator {
        &self.reauth
    }

    /// Execute a call and decode the JSON body.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        body: Option<serde_json::Value>,
        bearer: Option<String>,
    ) -> Result<T> {
        let response = self
            .run(Call {
                method,
                path,
                body,
                bearer,
            })
            .await?;
        decode_body(&response)
    }

    /// Execute a call whose success response carries no body of interest.
    pub async fn execute_no_content(
        &self,
        path: &str,
        method: Method,
        body: Option<serde_json::Value>,
        bearer: Option<String>,
    ) -> Result<()> {
        self.run(Call {
            method,
            path,
            body,
            bearer,
        })
        .await
        .map(|_| ())
    }

    async fn run(&self, call: Call<'_>) -> Result<ApiResponse> {
        let mut phase = Phase::Attempting;

        loop {
            phase = match phase {
                Phase::Attempting => match self.attempt_candidates(&call).await {
                    Ok((url, response))
                        if response.status == UNAUTHORIZED && call.bearer.is_some() =>
                    {
                        debug!(url = %url, "Unauthorized, refreshing access token");
                        Phase::Refreshing { url }
                    }
                    Ok((_, response)) => Phase::Done(response),
                    Err(e) => Phase::Failed(e),
                },
                Phase::Refreshing { url } => match self
                    .reauth
                    .refresh(call.bearer.as_deref().unwrap_or_default())
                    .await
                {
                    Some(token) => Phase::Retrying { url, token },
                    None => self.expire().await,
                },
                Phase::Retrying { url, token } => {
                    match self.transport.send(call.request(url.clone(), Some(token))).await {
                        Ok(response) if response.status == UNAUTHORIZED => self.expire().await,
                        Ok(response) => Phase::Done(response),
                        Err(e) => Phase::Failed(ClientError::NetworkUnreachable {
                            url,
                            reason: e.to_string(),
                        }),
                    }
                }
                Phase::Done(response) if response.is_success() => return Ok(response),
                Phase::Done(response) => return Err(http_error(&response)),
                Phase::Failed(e) => return Err(e),
            };
        }
    }

    /// Walk the candidate × attempt matrix until any response arrives.
    ///
    /// Returns the URL that answered together with its response.
    async fn attempt_candidates(&self, call: &Call<'_>) -> Result<(String, ApiResponse)> {
        let candidates = self.endpoints.resolve_candidates();
        let mut last: Option<(String, RequestAttempt)> = None;

        for mut attempt in self.policy.schedule(candidates.len()) {
            if !attempt.delay.is_zero() {
                tokio::time::sleep(attempt.delay).await;
            }

            let url = format!("{}{}", candidates[attempt.candidate_index], call.path);
            debug!(
                url = %url,
                candidate = attempt.candidate_index,
                attempt = attempt.attempt_index,
                "Sending request"
            );

            match self
                .transport
                .send(call.request(url.clone(), call.bearer.clone()))
                .await
            {
                Ok(response) => return Ok((url, response)),
                Err(e) => {
                    warn!(
                        url = %url,
                        candidate = attempt.candidate_index,
                        attempt = attempt.attempt_index,
                        error = %e,
                        "Request attempt failed"
                    );
                    attempt.error = Some(e.to_string());
                    last = Some((url, attempt));
                }
            }
        }

        let (url, reason) = match last {
            Some((url, attempt)) => (url, attempt.error.unwrap_or_default()),
            None => (call.path.to_string(), "no endpoint candidates".to_string()),
        };
        Err(ClientError::NetworkUnreachable { url, reason })
    }

    async fn expire(&self) -> Phase {
        warn!("Session expired, clearing credentials");
        self.session.clear().await;
        Phase::Failed(ClientError::AuthExpired)
    }
}

/// Decode a success body; an empty body decodes as JSON `null`.
fn decode_body<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
    let body: &[u8] = if response.body.is_empty() {
        b"null"
    } else {
        &response.body
    };
    Ok(serde_json::from_slice(body)?)
}

/// Build the error for a non-success response.
///
/// Prefers a non-blank string `detail` from a JSON body, then the raw text,
/// then a generic message with the status.
fn http_error(response: &ApiResponse) -> ClientError {
    let status = response.status;

    if response.is_json()
        && let Ok(payload) = serde_json::from_slice::<serde_json::Value>(&response.body)
        && let Some(detail) = payload.get("detail").and_then(|d| d.as_str())
        && !detail.trim().is_empty()
    {
        return ClientError::Http {
            status,
            message: detail.to_string(),
        };
    }

    let text = response.text();
    let message = if text.trim().is_empty() {
        format!("request failed: {status}")
    } else {
        text
    };
    ClientError::Http { status, message }
}
