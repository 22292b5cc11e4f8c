//! Client registry interface.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use super::{
    entity::Ident,
    error::PushError,
    value_object::{ClientId, FeedKey, Timestamp},
};

/// Outbound queue of one connection
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// What the registry holds for each live connection
#[derive(Debug, Clone)]
pub struct ClientHandle {
    /// Frames queued here are written by the connection's control loop
    pub sender: PusherChannel,
    /// Asks the connection to close at its next loop iteration
    pub close: Arc<Notify>,
    pub ident: Ident,
    pub connected_at: Timestamp,
}

/// Directory of every connected client and the feed each one is synced to
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Add a client in unsynced state
    async fn register(&self, id: ClientId, handle: ClientHandle);

    /// Drop a client and its subscription. Unknown ids are ignored.
    async fn remove(&self, id: &ClientId);

    /// Mark a client synced to `feed`, replacing any previous subscription
    async fn subscribe(&self, id: &ClientId, feed: FeedKey) -> Result<(), PushError>;

    /// Return a client to unsynced state
    async fn unsubscribe(&self, id: &ClientId);

    /// Feed the client is synced to, if any
    async fn synced_feed(&self, id: &ClientId) -> Option<FeedKey>;

    /// Enqueue `frame` for every client synced to `feed`. Never waits on a
    /// client. Returns the number of queues the frame was handed to.
    async fn broadcast(&self, feed: &FeedKey, frame: &str) -> usize;

    /// Number of clients synced to `feed`
    async fn count_synced(&self, feed: &FeedKey) -> usize;

    /// Number of registered clients, synced or not
    async fn len(&self) -> usize;

    /// Signal every client to close
    async fn close_all(&self);
}
