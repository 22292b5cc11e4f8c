//! Canonical store interface.
//!
//! The post/thread store is an external collaborator. The sync core only needs
//! to read threads and posts, open a post and flush its final body.

use std::net::IpAddr;

use async_trait::async_trait;

use super::{
    entity::{Post, Thread},
    error::RepositoryError,
    value_object::{BoardId, PostId, ThreadId, Timestamp},
};

/// Canonical post/thread store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Read a thread with all of its posts
    async fn get_thread(&self, id: ThreadId) -> Result<Thread, RepositoryError>;

    /// Read a single post
    async fn get_post(&self, id: PostId) -> Result<Post, RepositoryError>;

    /// Create an empty thread. Board CRUD is out of scope for the sync core;
    /// this exists so deployments and tests can seed threads.
    async fn create_thread(
        &self,
        board: BoardId,
        subject: String,
        created_at: Timestamp,
    ) -> Result<ThreadId, RepositoryError>;

    /// Whether any thread lives on `board`
    async fn board_exists(&self, board: &BoardId) -> Result<bool, RepositoryError>;

    /// Insert a post in editing state and return its id
    async fn insert_post(
        &self,
        thread: ThreadId,
        board: BoardId,
        ip: IpAddr,
        created_at: Timestamp,
    ) -> Result<PostId, RepositoryError>;

    /// Store the final body of a post and mark it closed
    async fn close_post(&self, id: PostId, body: String) -> Result<(), RepositoryError>;
}
