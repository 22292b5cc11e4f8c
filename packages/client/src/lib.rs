//! CLI thread watcher for Kakiko.
//!
//! Syncs to a thread over WebSocket, prints every post mutation as it
//! happens and composes posts from stdin. Reconnects on connection loss and
//! fills the gap from the HTTP backlog.

pub mod backlog;
pub mod domain;
pub mod error;
pub mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::{ClientConfig, run_client};
