//! クライアントレジストリの実装
//!
//! ## 実装
//!
//! - `channel`: 接続ごとの mpsc チャンネルへ積むだけの実装

pub mod channel;

pub use channel::ChannelClientRegistry;
