//! Real-time thread synchronisation server for the Kakiko discussion board.
//!
//! Connected viewers sync to a thread or board feed over WebSocket, receive
//! every post mutation live, and recover anything they missed by pulling a
//! counter range of the feed's backlog over HTTP.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
