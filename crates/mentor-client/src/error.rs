//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to callers of the mentor client.
///
/// The `Display` output is the message shown to the user; there is no
/// separate error code.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No candidate endpoint produced any response.
    #[error("could not reach the backend at {url} ({reason}); check that the API is up and the configured base URL")]
    NetworkUnreachable { url: String, reason: String },

    /// The backend answered with a non-success status.
    ///
    /// `message` is the server's `detail` verbatim when one was provided.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The access token expired and could not be refreshed.
    #[error("session expired, please log in again")]
    AuthExpired,

    /// The chat stream could not be opened or was interrupted.
    #[error("chat stream failed: {reason}")]
    StreamUnavailable { reason: String },

    /// A successful response carried a body of the wrong shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The durable session record could not be read or written.
    #[error("session persistence failed: {0}")]
    Persistence(String),
}

impl ClientError {
    /// HTTP status for server-reported failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the caller should treat the user as logged out.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
