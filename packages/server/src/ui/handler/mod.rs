//! Request handlers.

mod http;
mod websocket;

pub use http::{
    get_backlog, get_board_backlog, get_board_counter, get_post, get_thread, get_thread_counter,
    health_check,
};
pub use websocket::websocket_handler;
