//! UseCase errors.

use thiserror::Error;

use crate::domain::{EditError, FeedKey, PostId, PushError, RepositoryError};

/// Failure of an open-post operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("no post open")]
    NoPostOpen,

    #[error("post {0} is already open")]
    PostAlreadyOpen(PostId),

    #[error("open post expired")]
    PostExpired,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Failure to synchronise a client to a feed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The thread does not exist on the board, or the board is unknown
    #[error("no such feed: {0}")]
    InvalidTarget(FeedKey),

    #[error(transparent)]
    Push(#[from] PushError),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}
