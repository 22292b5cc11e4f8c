//! Canonical store implementations.

pub mod inmemory;

pub use inmemory::InMemoryPostStore;
