//! Conversion logic between DTOs and domain entities.

use kakiko_shared::time::timestamp_to_rfc3339;

use crate::domain::{OpenPost, Post, Thread};
use crate::infrastructure::dto::{
    http::{PostDto, ThreadDto},
    websocket::PostCreatedEvent,
};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<Post> for PostDto {
    fn from(model: Post) -> Self {
        Self {
            id: model.id.value(),
            thread: model.thread.value(),
            board: model.board.into_string(),
            body: model.body,
            created_at: timestamp_to_rfc3339(model.created_at.value()),
            editing: model.editing,
        }
    }
}

impl ThreadDto {
    /// Build the DTO of `thread` as read at feed `counter`
    pub fn from_thread(thread: Thread, counter: u64) -> Self {
        Self {
            id: thread.id.value(),
            board: thread.board.into_string(),
            subject: thread.subject,
            created_at: timestamp_to_rfc3339(thread.created_at.value()),
            counter,
            posts: thread.posts.into_iter().map(PostDto::from).collect(),
        }
    }
}

impl From<&OpenPost> for PostCreatedEvent {
    fn from(post: &OpenPost) -> Self {
        Self {
            id: post.id,
            thread: post.thread,
            board: post.board.clone(),
            time: post.created_at.value(),
        }
    }
}
