//! Utilities shared by the Kakiko server and client.

pub mod logger;
pub mod time;
