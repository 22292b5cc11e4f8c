//! WebSocket and HTTP front of the sync server.

mod connection;
mod error;
mod handler;
mod server;
mod signal;
pub mod state;

pub use error::ConnectionError;
pub use server::Server;
pub use state::AppState;
