//! SSE frame parser for the chat stream.
//!
//! The backend emits one JSON event per frame:
//!
//! ```text
//! data: {"type": "chunk", "text": "Hello "}\n\n
//! ```
//!
//! Handles:
//! - Incremental UTF-8 decoding (a code point split across reads is kept
//!   until the rest arrives; invalid bytes become U+FFFD)
//! - Frame splitting on the blank-line delimiter
//! - The `data: ` prefix and the `[DONE]` sentinel
//!
//! Only complete frames are yielded. A non-empty fragment left when the body
//! ends is yielded as a last frame.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

const FRAME_DELIMITER: &str = "\n\n";
const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

// ============================================================================
// UTF-8 decoding
// ============================================================================

/// Streaming UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, holding back an incomplete trailing sequence.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;
        let consumed = loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break self.pending.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + bad..];
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => break self.pending.len() - (rest.len() - valid),
                    }
                }
            }
        };

        self.pending.drain(..consumed);
        out
    }

    /// Flush at end of input. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

// ============================================================================
// Frame splitting
// ============================================================================

/// Splits decoded text into blank-line delimited frames.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: String,
}

impl FrameSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text and return every frame completed by it.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.find(FRAME_DELIMITER) {
            frames.push(self.buffer[..end].to_string());
            self.buffer.drain(..end + FRAME_DELIMITER.len());
        }
        frames
    }

    /// Take the trailing fragment, if it holds anything but whitespace.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

/// Extract the JSON payload of a frame.
///
/// Returns `None` for frames without the `data: ` prefix, empty payloads and
/// the `[DONE]` sentinel.
pub fn frame_payload(frame: &str) -> Option<&str> {
    let payload = frame.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }
    Some(payload)
}

// ============================================================================
// Stream adapter
// ============================================================================

/// A stream adapter that yields frame payloads from a byte stream.
///
/// Read errors are passed through; the adapter ends after the first one.
pub struct SseFrameStream<S> {
    inner: S,
    decoder: Utf8Decoder,
    splitter: FrameSplitter,
    ready: std::collections::VecDeque<String>,
    done: bool,
}

impl<S> SseFrameStream<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: Utf8Decoder::new(),
            splitter: FrameSplitter::new(),
            ready: std::collections::VecDeque::new(),
            done: false,
        }
    }

    fn queue_frames(&mut self, frames: Vec<String>) {
        self.ready.extend(
            frames
                .iter()
                .filter_map(|frame| frame_payload(frame))
                .map(str::to_string),
        );
    }
}

impl<S, E> Stream for SseFrameStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<String, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(payload) = self.ready.pop_front() {
                return Poll::Ready(Some(Ok(payload)));
            }
            if self.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let text = self.decoder.decode(&bytes);
                    let frames = self.splitter.push(&text);
                    self.queue_frames(frames);
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    self.done = true;
                    let tail = self.decoder.finish();
                    let mut frames = self.splitter.push(&tail);
                    frames.extend(self.splitter.finish());
                    self.queue_frames(frames);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
