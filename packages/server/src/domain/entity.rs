//! Entities.

use std::net::IpAddr;

use serde::Serialize;

use super::{
    error::EditError,
    value_object::{BoardId, PostId, ThreadId, Timestamp},
};

/// Who is on the other end of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub ip: IpAddr,
    /// Token of an authenticated session, if any
    pub session: Option<String>,
}

impl Ident {
    pub fn new(ip: IpAddr, session: Option<String>) -> Self {
        Self { ip, session }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }
}

/// Canonical post as kept by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub thread: ThreadId,
    pub board: BoardId,
    pub body: String,
    pub ip: IpAddr,
    pub created_at: Timestamp,
    /// Still being composed by its author
    pub editing: bool,
}

/// Canonical thread with its posts in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    pub id: ThreadId,
    pub board: BoardId,
    pub subject: String,
    pub created_at: Timestamp,
    pub posts: Vec<Post>,
}

/// Body of a post currently being composed by one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPost {
    pub id: PostId,
    pub thread: ThreadId,
    pub board: BoardId,
    body: String,
    /// Length of `body` in characters
    body_len: usize,
    pub created_at: Timestamp,
}

impl OpenPost {
    pub fn new(id: PostId, thread: ThreadId, board: BoardId, created_at: Timestamp) -> Self {
        Self {
            id,
            thread,
            board,
            body: String::new(),
            body_len: 0,
            created_at,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn body_len(&self) -> usize {
        self.body_len
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Whether the post has been open longer than `ttl_millis` at `now`
    pub fn is_expired(&self, now: Timestamp, ttl_millis: i64) -> bool {
        self.created_at.elapsed_until(now) > ttl_millis
    }

    /// Append text to the end of the body
    pub fn append(&mut self, text: &str, max_len: usize) -> Result<(), EditError> {
        let added = text.chars().count();
        if self.body_len + added > max_len {
            return Err(EditError::BodyTooLong { max: max_len });
        }
        self.body.push_str(text);
        self.body_len += added;
        Ok(())
    }

    /// Remove the last character. Returns `false` when the body was already empty.
    pub fn backspace(&mut self) -> bool {
        match self.body.pop() {
            Some(_) => {
                self.body_len -= 1;
                true
            }
            None => false,
        }
    }

    /// Replace `len` characters starting at character `start` with `text`
    pub fn splice(
        &mut self,
        start: usize,
        len: usize,
        text: &str,
        max_len: usize,
    ) -> Result<(), EditError> {
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.body_len)
            .ok_or(EditError::InvalidSplice {
                start,
                len,
                body_len: self.body_len,
            })?;

        let added = text.chars().count();
        let new_len = self.body_len - len + added;
        if new_len > max_len {
            return Err(EditError::BodyTooLong { max: max_len });
        }

        let byte_start = self.byte_offset(start);
        let byte_end = self.byte_offset(end);
        self.body.replace_range(byte_start..byte_end, text);
        self.body_len = new_len;
        Ok(())
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.body
            .char_indices()
            .nth(char_index)
            .map(|(offset, _)| offset)
            .unwrap_or(self.body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_post() -> OpenPost {
        OpenPost::new(
            PostId::new(7).unwrap(),
            ThreadId::new(42).unwrap(),
            BoardId::new("b".to_string()).unwrap(),
            Timestamp::new(1_000),
        )
    }

    #[test]
    fn test_append_accumulates_body_and_length() {
        // テスト項目: 追記した文字列が本文に蓄積され、文字数も更新される
        // given (前提条件):
        let mut post = open_post();

        // when (操作):
        post.append("hello", 2000).unwrap();
        post.append("wörld", 2000).unwrap();

        // then (期待する結果):
        assert_eq!(post.body(), "hellowörld");
        assert_eq!(post.body_len(), 10);
    }

    #[test]
    fn test_append_rejects_body_over_limit() {
        // テスト項目: 上限を超える追記は拒否され、本文は変わらない
        // given (前提条件):
        let mut post = open_post();
        post.append("abc", 4).unwrap();

        // when (操作):
        let result = post.append("de", 4);

        // then (期待する結果):
        assert_eq!(result, Err(EditError::BodyTooLong { max: 4 }));
        assert_eq!(post.body(), "abc");
    }

    #[test]
    fn test_backspace_removes_last_character() {
        // テスト項目: バックスペースで最後の 1 文字が削除され、空なら何もしない
        // given (前提条件):
        let mut post = open_post();
        post.append("aé", 2000).unwrap();

        // when (操作):
        let first = post.backspace();
        let second = post.backspace();
        let third = post.backspace();

        // then (期待する結果):
        assert!(first && second);
        assert!(!third);
        assert_eq!(post.body(), "");
        assert_eq!(post.body_len(), 0);
    }

    #[test]
    fn test_splice_replaces_character_range() {
        // テスト項目: splice で指定範囲の文字が置換される（マルチバイト文字を含む）
        // given (前提条件):
        let mut post = open_post();
        post.append("こんにちは", 2000).unwrap();

        // when (操作):
        post.splice(2, 3, "ばんは!", 2000).unwrap();

        // then (期待する結果):
        assert_eq!(post.body(), "こんばんは!");
        assert_eq!(post.body_len(), 6);
    }

    #[test]
    fn test_splice_out_of_bounds_is_rejected() {
        // テスト項目: 本文の範囲外を指す splice はエラーになる
        // given (前提条件):
        let mut post = open_post();
        post.append("abc", 2000).unwrap();

        // when (操作):
        let result = post.splice(2, 5, "x", 2000);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(EditError::InvalidSplice {
                start: 2,
                len: 5,
                body_len: 3
            })
        );
        assert_eq!(post.body(), "abc");
    }

    #[test]
    fn test_is_expired_after_ttl() {
        // テスト項目: TTL を超えて初めて期限切れと判定される
        // given (前提条件):
        let post = open_post();

        // then (期待する結果):
        assert!(!post.is_expired(Timestamp::new(1_000 + 500), 500));
        assert!(post.is_expired(Timestamp::new(1_000 + 501), 500));
    }
}
