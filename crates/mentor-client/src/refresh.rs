//! Re-authentication: exchange the stored refresh token for a new pair.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{RefreshRequest, TokenPair, paths};
use crate::endpoint::EndpointRegistry;
use crate::session::SessionStore;
use crate::sync::KeyedLocks;
use crate::transport::{ApiRequest, HttpTransport, Method};

/// Runs the refresh cycle against every endpoint candidate.
///
/// Concurrent refreshes of the same refresh token are collapsed: callers
/// that waited on an in-flight exchange reuse its outcome.
#[derive(Clone)]
pub struct Reauthenticator {
    endpoints: EndpointRegistry,
    transport: Arc<dyn HttpTransport>,
    session: SessionStore,
    inflight: KeyedLocks,
}

impl Reauthenticator {
    pub fn new(
        endpoints: EndpointRegistry,
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
    ) -> Self {
        Self {
            endpoints,
            transport,
            session,
            inflight: KeyedLocks::new(),
        }
    }

    /// Obtain a new access token to replace `rejected`, or `None` when no
    /// refresh token is stored or every candidate failed.
    ///
    /// When the session already holds a different access token, it was
    /// rotated after `rejected` was sent and is returned without a network
    /// exchange. On failure the stale session is left untouched; clearing it
    /// is the caller's decision.
    pub async fn refresh(&self, rejected: &str) -> Option<String> {
        let current = self.session.snapshot().await;
        if let Some(access) = current.access_token.filter(|a| a != rejected) {
            debug!("Access token already rotated, reusing it");
            return Some(access);
        }
        let stale = current.refresh_token?;

        let lock = self.inflight.get(&stale);
        let outcome = {
            let _guard = lock.lock().await;

            let current = self.session.snapshot().await;
            if current.refresh_token.as_deref() != Some(stale.as_str()) {
                debug!("Refresh token already rotated by a concurrent refresh");
                current.access_token
            } else {
                self.exchange(&stale).await
            }
        };
        drop(lock);
        self.inflight.release(&stale);

        outcome
    }

    async fn exchange(&self, refresh_token: &str) -> Option<String> {
        let candidates = self.endpoints.resolve_candidates();
        let mut last_error = String::from("no candidates");

        for base in &candidates {
            let url = format!("{}{}", base, paths::REFRESH);
            let body = match serde_json::to_value(RefreshRequest {
                refresh_token: refresh_token.to_string(),
            }) {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "Failed to encode refresh request");
                    return None;
                }
            };
            let request = ApiRequest {
                method: Method::POST,
                url: url.clone(),
                body: Some(body),
                bearer: None,
            };

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    debug!(url = %url, error = %e, "Refresh candidate unreachable");
                    last_error = e.to_string();
                    continue;
                }
            };

            if !response.is_success() {
                debug!(url = %url, status = response.status, "Refresh rejected");
                last_error = format!("refresh failed: {}", response.status);
                continue;
            }

            let pair: TokenPair = match serde_json::from_slice(&response.body) {
                Ok(pair) => pair,
                Err(e) => {
                    last_error = format!("invalid refresh response: {e}");
                    continue;
                }
            };
            if !pair.is_complete() {
                last_error = "refresh response missing tokens".to_string();
                continue;
            }

            let committed = self
                .session
                .set_tokens_if(refresh_token, pair.access_token.clone(), pair.refresh_token)
                .await;
            if !committed {
                warn!("Session changed during token refresh, discarding new tokens");
                return None;
            }
            info!(url = %url, "Access token refreshed");
            return Some(pair.access_token);
        }

        warn!(
            candidates = candidates.len(),
            error = %last_error,
            "Token refresh failed on every candidate"
        );
        None
    }
}
