//! Chat stream consumer.
//!
//! Opens `POST /chat/stream` against the primary endpoint and turns its SSE
//! frames into typed [`StreamEvent`]s. The caller pulls events; once the body
//! ends, [`ChatEventStream::finish`] resolves to the final reply.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{CorrectionMeta, stream_kind};
use crate::endpoint::EndpointRegistry;
use crate::error::{ClientError, Result};
use crate::sse::SseFrameStream;
use crate::transport::{ApiRequest, ByteStream, HttpTransport, Method};

// ============================================================================
// Events
// ============================================================================

/// Grammar correction of the user's message, sent before the reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correction {
    pub user_message_id: String,
    pub corrected_text: String,
    pub meta: CorrectionMeta,
}

/// Events received from the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The corrected user message. Yielded at most once.
    Correction(Correction),
    /// A piece of the assistant's reply.
    Chunk(String),
    /// The server's final reply. Authoritative over the streamed chunks.
    Done {
        assistant_message_id: String,
        full_reply: String,
    },
}

/// Outcome of a completed stream.
///
/// Both fields are empty when the server never sent a `done` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub assistant_message_id: String,
    pub full_reply: String,
}

/// Frame payload as sent by the backend. Every field but `type` is optional.
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    user_message_id: Option<String>,
    #[serde(default)]
    corrected_text: Option<String>,
    #[serde(default)]
    changed: Option<bool>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    categories: Option<Vec<String>>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    assistant_message_id: Option<String>,
    #[serde(default)]
    full_reply: Option<String>,
}

impl WireEvent {
    fn into_correction(self) -> Correction {
        Correction {
            user_message_id: self.user_message_id.unwrap_or_default(),
            corrected_text: self.corrected_text.unwrap_or_default(),
            meta: CorrectionMeta {
                changed: self.changed.unwrap_or(false),
                notes: self.notes.unwrap_or_default(),
                categories: self.categories.unwrap_or_default(),
                provider: self.provider.unwrap_or_default(),
                model: self.model.unwrap_or_default(),
            },
        }
    }
}

// ============================================================================
// ChatEventStream
// ============================================================================

/// Pull-based sequence of chat events. Finite and not restartable.
///
/// Malformed frames are skipped. A read failure yields one
/// [`ClientError::StreamUnavailable`] and ends the sequence. Dropping the
/// stream closes the connection.
pub struct ChatEventStream {
    frames: SseFrameStream<ByteStream>,
    correction_seen: bool,
    streamed: String,
    reply: ChatReply,
    finished: bool,
}

impl ChatEventStream {
    pub fn new(body: ByteStream) -> Self {
        Self {
            frames: SseFrameStream::new(body),
            correction_seen: false,
            streamed: String::new(),
            reply: ChatReply::default(),
            finished: false,
        }
    }

    /// Drain the remaining events and return the final reply.
    pub async fn finish(mut self) -> Result<ChatReply> {
        while let Some(event) = self.next().await {
            event?;
        }
        Ok(self.reply)
    }

    /// The last `done` values seen so far.
    pub fn reply(&self) -> &ChatReply {
        &self.reply
    }

    /// Concatenation of every chunk yielded so far.
    pub fn streamed_text(&self) -> &str {
        &self.streamed
    }

    /// Map one payload to an event, or `None` when it is dropped.
    fn dispatch(&mut self, payload: &str) -> Option<StreamEvent> {
        let wire: WireEvent = match serde_json::from_str(payload) {
            Ok(wire) => wire,
            Err(e) => {
                warn!(error = %e, "Skipping malformed stream frame");
                return None;
            }
        };

        match wire.kind.as_str() {
            stream_kind::CORRECTION => {
                if self.correction_seen {
                    debug!("Ignoring repeated correction event");
                    return None;
                }
                self.correction_seen = true;
                Some(StreamEvent::Correction(wire.into_correction()))
            }
            stream_kind::CHUNK => {
                let text = wire.text.filter(|t| !t.is_empty())?;
                self.streamed.push_str(&text);
                Some(StreamEvent::Chunk(text))
            }
            stream_kind::DONE => {
                self.reply = ChatReply {
                    assistant_message_id: wire.assistant_message_id.unwrap_or_default(),
                    full_reply: wire.full_reply.unwrap_or_default(),
                };
                Some(StreamEvent::Done {
                    assistant_message_id: self.reply.assistant_message_id.clone(),
                    full_reply: self.reply.full_reply.clone(),
                })
            }
            other => {
                debug!(kind = other, "Skipping unknown stream event");
                None
            }
        }
    }
}

impl Stream for ChatEventStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            match Pin::new(&mut self.frames).poll_next(cx) {
                Poll::Ready(Some(Ok(payload))) => {
                    if let Some(event) = self.dispatch(&payload) {
                        return Poll::Ready(Some(Ok(event)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!(error = %e, "Chat stream interrupted");
                    self.finished = true;
                    return Poll::Ready(Some(Err(ClientError::StreamUnavailable {
                        reason: e.to_string(),
                    })));
                }
                Poll::Ready(None) => {
                    self.finished = true;
                    if self.reply.assistant_message_id.is_empty() && self.reply.full_reply.is_empty()
                    {
                        debug!("Chat stream ended without a done event");
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

// ============================================================================
// StreamingClient
// ============================================================================

/// Opens streaming requests. No retry, no failover, no refresh.
#[derive(Clone)]
pub struct StreamingClient {
    endpoints: EndpointRegistry,
    transport: Arc<dyn HttpTransport>,
}

impl StreamingClient {
    pub fn new(endpoints: EndpointRegistry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoints,
            transport,
        }
    }

    /// POST `body` to `path` on the primary endpoint and return its events.
    pub async fn open(
        &self,
        path: &str,
        body: serde_json::Value,
        bearer: Option<String>,
    ) -> Result<ChatEventStream> {
        let url = format!("{}{}", self.endpoints.primary(), path);
        debug!(url = %url, "Opening chat stream");

        let response = self
            .transport
            .open_stream(ApiRequest {
                method: Method::POST,
                url,
                body: Some(body),
                bearer,
            })
            .await
            .map_err(|e| ClientError::StreamUnavailable {
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(ClientError::StreamUnavailable {
                reason: format!("status {}", response.status),
            });
        }

        let body = response.body.ok_or_else(|| ClientError::StreamUnavailable {
            reason: "response has no body".to_string(),
        })?;
        Ok(ChatEventStream::new(body))
    }
}
