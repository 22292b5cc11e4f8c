//! Data Transfer Objects (DTOs) and the wire codec.
//!
//! DTOs are organized by protocol:
//! - `websocket`: message types and frame payloads
//! - `codec`: the `[2-digit type][JSON]` frame format
//! - `http`: HTTP API response DTOs

pub mod codec;
pub mod conversion;
pub mod http;
pub mod websocket;
