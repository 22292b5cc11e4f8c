//! Infrastructure layer.
//!
//! Wire formats and the in-memory implementations of the domain interfaces.

pub mod dto;
pub mod feed;
pub mod registry;
pub mod repository;
