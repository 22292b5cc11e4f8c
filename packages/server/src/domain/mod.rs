//! Domain layer.
//!
//! Value objects, entities and the collaborator interfaces (canonical store,
//! update feed, client registry) the rest of the server is written against.
//! Concrete implementations live in the infrastructure layer.

pub mod entity;
pub mod error;
pub mod feed;
pub mod registry;
pub mod repository;
pub mod value_object;

pub use entity::{Ident, OpenPost, Post, Thread};
pub use error::{EditError, PushError, RepositoryError, ValueObjectError};
pub use feed::UpdateFeed;
pub use registry::{ClientHandle, ClientRegistry, PusherChannel};
pub use repository::PostStore;
#[cfg(test)]
pub use repository::MockPostStore;
pub use value_object::{BoardId, ClientId, Counter, FeedKey, PostId, ThreadId, Timestamp};
