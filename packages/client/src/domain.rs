//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use kakiko_server::{
    domain::{BoardId, Counter, ThreadId},
    infrastructure::dto::{
        codec::{CodecError, encode},
        websocket::{InsertPostRequest, MessageType},
    },
};

use crate::error::ClientError;

/// Input line that closes the open post
pub const CLOSE_COMMAND: &str = "/close";

/// Tracks the counter of the feed the client is synced to.
///
/// Survives reconnects so the missed range can be pulled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CounterTracker {
    last: Option<Counter>,
}

impl CounterTracker {
    /// Counter of the last event seen, `None` before the first sync
    pub fn last(&self) -> Option<Counter> {
        self.last
    }

    /// Record the counter a (re)synchronise reply carried
    pub fn on_sync(&mut self, counter: Counter) {
        self.last = Some(counter);
    }

    /// Account for one frame received live. Only feed events advance the counter.
    pub fn on_frame(&mut self, tag: u8) {
        let is_feed_event = MessageType::try_from(tag).is_ok_and(MessageType::is_feed_event);
        if let (true, Some(last)) = (is_feed_event, self.last.as_mut()) {
            *last += 1;
        }
    }
}

/// Whether the client is composing a post
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ComposeState {
    open: bool,
}

impl ComposeState {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The server closes open posts when a connection drops
    pub fn reset(&mut self) {
        self.open = false;
    }

    /// Frames to send for one line of input. Text opens a post when none is
    /// open and appends to it; [`CLOSE_COMMAND`] closes it.
    pub fn frames_for_line(
        &mut self,
        line: &str,
        thread: ThreadId,
        board: &BoardId,
    ) -> Result<Vec<String>, CodecError> {
        if line == CLOSE_COMMAND {
            if !self.open {
                return Ok(Vec::new());
            }
            self.open = false;
            return Ok(vec![encode(MessageType::ClosePost, &())?]);
        }

        let mut frames = Vec::with_capacity(2);
        if !self.open {
            let request = InsertPostRequest {
                thread,
                board: board.clone(),
            };
            frames.push(encode(MessageType::InsertPost, &request)?);
            self.open = true;
        }
        frames.push(encode(MessageType::Append, line)?);
        Ok(frames)
    }
}

/// HTTP base URL of the server behind a `ws://` / `wss://` endpoint
pub fn http_base(ws_url: &str) -> Result<String, ClientError> {
    let (scheme, rest) = if let Some(rest) = ws_url.strip_prefix("ws://") {
        ("http", rest)
    } else if let Some(rest) = ws_url.strip_prefix("wss://") {
        ("https", rest)
    } else {
        return Err(ClientError::InvalidUrl(ws_url.to_string()));
    };
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(ClientError::InvalidUrl(ws_url.to_string()));
    }
    Ok(format!("{}://{}", scheme, host))
}

/// Check if the client should attempt to reconnect.
///
/// A rejected handshake won't succeed on retry.
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if matches!(error, ClientError::Rejected(_) | ClientError::InvalidUrl(_)) {
        return false;
    }
    current_attempt < max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread() -> ThreadId {
        ThreadId::new(42).unwrap()
    }

    fn board() -> BoardId {
        BoardId::new("b".to_string()).unwrap()
    }

    #[test]
    fn test_tracker_counts_only_feed_events() {
        // テスト項目: 同期後はフィードイベントの受信ごとにカウンタが進み、応答では進まない
        // given (前提条件):
        let mut tracker = CounterTracker::default();
        tracker.on_sync(5);

        // when (操作):
        tracker.on_frame(MessageType::InsertPost.tag());
        tracker.on_frame(MessageType::Append.tag());
        tracker.on_frame(MessageType::PostId.tag());
        tracker.on_frame(MessageType::ClosePost.tag());

        // then (期待する結果):
        assert_eq!(tracker.last(), Some(8));
    }

    #[test]
    fn test_tracker_ignores_frames_before_sync() {
        // テスト項目: 同期前のフレームではカウンタは設定されない
        // given (前提条件):
        let mut tracker = CounterTracker::default();

        // when (操作):
        tracker.on_frame(MessageType::Append.tag());

        // then (期待する結果):
        assert_eq!(tracker.last(), None);
    }

    #[test]
    fn test_first_line_opens_post() {
        // テスト項目: 最初の入力で投稿を開始して追記し、次の入力は追記のみ
        // given (前提条件):
        let mut state = ComposeState::default();

        // when (操作):
        let first = state.frames_for_line("hello", thread(), &board()).unwrap();
        let second = state.frames_for_line("world", thread(), &board()).unwrap();

        // then (期待する結果):
        assert_eq!(
            first,
            vec!["02{\"thread\":42,\"board\":\"b\"}", "03\"hello\""]
        );
        assert_eq!(second, vec!["03\"world\""]);
        assert!(state.is_open());
    }

    #[test]
    fn test_close_command() {
        // テスト項目: /close で投稿を閉じ、投稿がなければ何も送らない
        // given (前提条件):
        let mut state = ComposeState::default();
        state.frames_for_line("x", thread(), &board()).unwrap();

        // when (操作):
        let close = state.frames_for_line(CLOSE_COMMAND, thread(), &board()).unwrap();
        let again = state.frames_for_line(CLOSE_COMMAND, thread(), &board()).unwrap();

        // then (期待する結果):
        assert_eq!(close, vec!["06null"]);
        assert!(again.is_empty());
        assert!(!state.is_open());
    }

    #[test]
    fn test_http_base() {
        // テスト項目: WebSocket の URL から HTTP のベース URL が得られる
        // given (前提条件):
        let plain = "ws://127.0.0.1:8080/ws";
        let secure = "wss://kakiko.example/ws";

        // when (操作):
        let results = (http_base(plain), http_base(secure), http_base("http://x"));

        // then (期待する結果):
        assert_eq!(results.0.unwrap(), "http://127.0.0.1:8080");
        assert_eq!(results.1.unwrap(), "https://kakiko.example");
        assert!(matches!(results.2, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_should_attempt_reconnect() {
        // テスト項目: 接続エラーは上限まで再接続し、ハンドシェイク拒否は再接続しない
        // given (前提条件):
        let lost = ClientError::ConnectionError("reset".to_string());
        let rejected = ClientError::Rejected(403);

        // when (操作):
        let results = (
            should_attempt_reconnect(&lost, 0, 5),
            should_attempt_reconnect(&lost, 5, 5),
            should_attempt_reconnect(&rejected, 0, 5),
        );

        // then (期待する結果):
        assert_eq!(results, (true, false, false));
    }
}
