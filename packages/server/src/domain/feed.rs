//! Update feed interface.

use async_trait::async_trait;

use super::{
    error::PushError,
    value_object::{ClientId, Counter, FeedKey},
};

/// Per-thread/board append-only log of encoded frames.
///
/// `append` is the single write path: it both records the frame for backlog
/// replay and fans it out to every subscribed connection.
#[async_trait]
pub trait UpdateFeed: Send + Sync {
    /// Append a frame and broadcast it. Returns the index assigned to it.
    async fn append(&self, feed: &FeedKey, frame: String) -> Counter;

    /// Index the next appended frame will receive
    async fn current_counter(&self, feed: &FeedKey) -> Counter;

    /// Frames with index in `[start, end)`. Empty when the range is empty,
    /// not yet populated or no longer retained.
    async fn range(&self, feed: &FeedKey, start: Counter, end: Counter) -> Vec<String>;

    /// Subscribe a registered client to `feed` and return the counter it is
    /// synced at. Every frame is either below the returned counter or
    /// delivered live to the client, never both.
    async fn subscribe(&self, feed: &FeedKey, client: ClientId) -> Result<Counter, PushError>;
}
