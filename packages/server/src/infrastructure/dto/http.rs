//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Post as served over HTTP. The poster's IP is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDto {
    pub id: u64,
    pub thread: u64,
    pub board: String,
    pub body: String,
    /// RFC 3339
    pub created_at: String,
    pub editing: bool,
}

/// Thread with its posts and the feed counter it was read at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadDto {
    pub id: u64,
    pub board: String,
    pub subject: String,
    /// RFC 3339
    pub created_at: String,
    pub counter: u64,
    pub posts: Vec<PostDto>,
}

/// Current state of one feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCounterDto {
    pub feed: String,
    pub counter: u64,
    pub synced: usize,
}
