//! Per-connection errors.
//!
//! Every layer's error is flattened into [`ConnectionError`] at the
//! connection boundary. Any of them terminates that connection only.

use axum::extract::ws::close_code;
use thiserror::Error;

use crate::{
    domain::{EditError, FeedKey, PostId, PushError, RepositoryError},
    infrastructure::dto::codec::CodecError,
    usecase::{ComposeError, SyncError},
};

/// Longest close reason a close frame can carry
pub const MAX_CLOSE_REASON: usize = 123;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("malformed frame: {0:?}")]
    MalformedFrame(String),

    #[error("unsupported frame kind: {0}")]
    UnsupportedFrameKind(&'static str),

    #[error("message type {0:02} sent before synchronising")]
    OutOfSequence(u8),

    #[error("unknown message type: {0:02}")]
    UnknownMessageType(u8),

    #[error("invalid payload for message type {tag:02}: {reason}")]
    InvalidPayload { tag: u8, reason: String },

    #[error("no post open")]
    NoPostOpen,

    #[error("post {0} is already open")]
    PostAlreadyOpen(PostId),

    #[error("open post expired")]
    PostExpired,

    #[error("post body exceeds {max} characters")]
    BodyTooLong { max: usize },

    #[error("splice {start}+{len} out of bounds for body of {body_len}")]
    InvalidSplice {
        start: usize,
        len: usize,
        body_len: usize,
    },

    #[error("no such thread or board: {0}")]
    InvalidSyncTarget(FeedKey),

    #[error("timed out")]
    TransportTimeout,

    #[error("origin rejected: {0}")]
    OriginRejected(String),

    #[error("store: {0}")]
    Store(#[from] RepositoryError),

    #[error("registry: {0}")]
    Registry(#[from] PushError),

    #[error("transport: {0}")]
    Transport(#[from] axum::Error),

    #[error("failed to encode payload: {0}")]
    EncodingFailure(#[source] serde_json::Error),
}

impl ConnectionError {
    /// Close code sent to the client
    pub fn close_code(&self) -> u16 {
        match self {
            Self::TransportTimeout => close_code::AWAY,
            _ => close_code::INVALID,
        }
    }

    /// Close reason, cut to fit a close frame
    pub fn close_reason(&self) -> String {
        truncate_utf8(self.to_string(), MAX_CLOSE_REASON)
    }

    /// Whether the client should get an Invalid frame before the close.
    /// A dead transport can't carry one.
    pub fn notifies_client(&self) -> bool {
        !matches!(self, Self::TransportTimeout | Self::Transport(_))
    }
}

impl From<CodecError> for ConnectionError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::MalformedFrame(preview) => Self::MalformedFrame(preview),
            CodecError::UnknownMessageType(tag) => Self::UnknownMessageType(tag),
            CodecError::InvalidPayload { tag, source } => Self::InvalidPayload {
                tag,
                reason: source.to_string(),
            },
            CodecError::EncodingFailure(e) => Self::EncodingFailure(e),
        }
    }
}

impl From<EditError> for ConnectionError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::BodyTooLong { max } => Self::BodyTooLong { max },
            EditError::InvalidSplice {
                start,
                len,
                body_len,
            } => Self::InvalidSplice {
                start,
                len,
                body_len,
            },
        }
    }
}

impl From<ComposeError> for ConnectionError {
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::NoPostOpen => Self::NoPostOpen,
            ComposeError::PostAlreadyOpen(id) => Self::PostAlreadyOpen(id),
            ComposeError::PostExpired => Self::PostExpired,
            ComposeError::Edit(e) => e.into(),
            ComposeError::Store(e) => Self::Store(e),
        }
    }
}

impl From<SyncError> for ConnectionError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::InvalidTarget(feed) => Self::InvalidSyncTarget(feed),
            SyncError::Push(e) => Self::Registry(e),
            SyncError::Store(e) => Self::Store(e),
        }
    }
}

fn truncate_utf8(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}
