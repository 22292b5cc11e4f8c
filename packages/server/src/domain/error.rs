//! Domain errors.

use thiserror::Error;

use super::value_object::{BoardId, ClientId, PostId, ThreadId};

/// Invalid input for a value object
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("id must not be zero")]
    ZeroId,

    #[error("invalid board name: '{0}'")]
    InvalidBoard(String),
}

/// Canonical store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("thread {0} not found")]
    ThreadNotFound(ThreadId),

    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("thread {thread} does not belong to board '{board}'")]
    BoardMismatch { thread: ThreadId, board: BoardId },

    #[error("post {0} is already closed")]
    PostAlreadyClosed(PostId),
}

/// Rejected edit of an open post body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("post body exceeds {max} characters")]
    BodyTooLong { max: usize },

    #[error("splice out of bounds: start {start}, len {len}, body length {body_len}")]
    InvalidSplice {
        start: usize,
        len: usize,
        body_len: usize,
    },
}

/// Failure to reach a registered connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("client '{0}' not found")]
    ClientNotFound(ClientId),
}
