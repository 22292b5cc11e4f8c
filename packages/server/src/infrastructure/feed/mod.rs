//! Update feed implementations.

pub mod inmemory;

pub use inmemory::InMemoryUpdateFeed;
