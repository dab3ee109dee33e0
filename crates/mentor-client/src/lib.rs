//! Mentor client - resilient HTTP and SSE access to the AI English Mentor API.

// ============================================================================
// Core Infrastructure
// ============================================================================

pub mod build_info;
pub mod config;
pub mod error;
pub mod sync;

// ============================================================================
// Transport & Execution
// ============================================================================

pub mod endpoint;
pub mod executor;
pub mod refresh;
pub mod retry;
pub mod transport;

// ============================================================================
// Streaming
// ============================================================================

pub mod sse;
pub mod stream;

// ============================================================================
// Domain & Client
// ============================================================================

pub mod api;
pub mod client;
pub mod session;

#[cfg(test)]
mod testing;

pub use client::MentorClient;
pub use error::{ClientError, Result};
