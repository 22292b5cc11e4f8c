//! In-memory store used by the bundled server and by tests.

pub mod post;

pub use post::InMemoryPostStore;
