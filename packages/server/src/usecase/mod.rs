//! UseCase layer.

mod compose_post;
mod error;
mod get_backlog;
mod get_thread;
mod synchronise;

pub use compose_post::{ComposeSettings, PostComposer};
pub use error::{ComposeError, SyncError};
pub use get_backlog::{FeedState, GetBacklogUseCase, GetFeedStateUseCase};
pub use get_thread::{GetPostUseCase, GetThreadUseCase};
pub use synchronise::{SyncOutcome, SynchroniseUseCase};
