//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::transport::{
    ApiRequest, ApiResponse, HttpTransport, StreamingResponse, TransportError,
};

/// One scripted outcome, consumed in order by either trait method.
pub(crate) enum Reply {
    Response(ApiResponse),
    Unreachable(String),
    Stream {
        status: u16,
        chunks: Option<Vec<Result<Bytes, TransportError>>>,
    },
}

impl Reply {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Self::Response(ApiResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(body.to_string()),
        })
    }

    pub(crate) fn text(status: u16, body: &str) -> Self {
        Self::Response(ApiResponse {
            status,
            content_type: Some("text/plain; charset=utf-8".to_string()),
            body: Bytes::from(body.to_string()),
        })
    }

    pub(crate) fn unreachable() -> Self {
        Self::Unreachable("connection refused".to_string())
    }

    pub(crate) fn stream(chunks: &[&[u8]]) -> Self {
        Self::Stream {
            status: 200,
            chunks: Some(
                chunks
                    .iter()
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect(),
            ),
        }
    }

    pub(crate) fn stream_then_error(chunks: &[&[u8]], error: &str) -> Self {
        let mut items: Vec<Result<Bytes, TransportError>> = chunks
            .iter()
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        items.push(Err(TransportError(error.to_string())));
        Self::Stream {
            status: 200,
            chunks: Some(items),
        }
    }

    pub(crate) fn stream_status(status: u16) -> Self {
        Self::Stream {
            status,
            chunks: Some(Vec::new()),
        }
    }

    pub(crate) fn stream_without_body() -> Self {
        Self::Stream {
            status: 200,
            chunks: None,
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn next(&self, request: ApiRequest) -> Option<Reply> {
        self.requests.lock().unwrap().push(request);
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;
        self.replies.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        match self.next(request).await {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Unreachable(reason)) => Err(TransportError(reason)),
            Some(Reply::Stream { .. }) => panic!("stream reply scripted for a buffered request"),
            None => Err(TransportError("no scripted reply".to_string())),
        }
    }

    async fn open_stream(&self, request: ApiRequest) -> Result<StreamingResponse, TransportError> {
        match self.next(request).await {
            Some(Reply::Stream { status, chunks }) => Ok(StreamingResponse {
                status,
                body: chunks.map(|items| {
                    Box::pin(futures::stream::iter(items)) as crate::transport::ByteStream
                }),
            }),
            Some(Reply::Unreachable(reason)) => Err(TransportError(reason)),
            Some(Reply::Response(_)) => panic!("buffered reply scripted for a stream request"),
            None => Err(TransportError("no scripted reply".to_string())),
        }
    }
}
