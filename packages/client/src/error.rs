//! Error types for the watcher client.

use kakiko_server::infrastructure::dto::codec::CodecError;
use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server URL can't be used
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),

    /// The server refused the WebSocket handshake
    #[error("Connection rejected with HTTP {0}")]
    Rejected(u16),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The server closed the connection
    #[error("Server closed the connection ({code}): {reason}")]
    Closed { code: u16, reason: String },

    /// Backlog or thread request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
