//! HTTP API endpoint handlers.

use std::{fmt::Write, sync::Arc};

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use crate::{
    domain::{BoardId, FeedKey, PostId, RepositoryError, ThreadId},
    infrastructure::dto::{
        codec::concat_frames,
        http::{FeedCounterDto, PostDto, ThreadDto},
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get a thread with its posts and the counter it was read at
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<u64>,
) -> Result<Json<ThreadDto>, StatusCode> {
    let id = ThreadId::new(thread).map_err(|_| StatusCode::BAD_REQUEST)?;
    match state.get_thread_usecase.execute(id).await {
        // Domain Model から DTO への変換
        Ok((thread, counter)) => Ok(Json(ThreadDto::from_thread(thread, counter))),
        Err(e) => Err(status_of(&e)),
    }
}

/// Get a single post
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(post): Path<u64>,
) -> Result<Json<PostDto>, StatusCode> {
    let id = PostId::new(post).map_err(|_| StatusCode::BAD_REQUEST)?;
    match state.get_post_usecase.execute(id).await {
        Ok(post) => Ok(Json(PostDto::from(post))),
        Err(e) => Err(status_of(&e)),
    }
}

/// Current counter of a thread feed
pub async fn get_thread_counter(
    State(state): State<Arc<AppState>>,
    Path(thread): Path<u64>,
) -> Result<Json<FeedCounterDto>, StatusCode> {
    let id = ThreadId::new(thread).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(feed_counter(&state, FeedKey::Thread(id)).await))
}

/// Current counter of a board feed
pub async fn get_board_counter(
    State(state): State<Arc<AppState>>,
    Path(board): Path<String>,
) -> Result<Json<FeedCounterDto>, StatusCode> {
    let board = BoardId::new(board).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(feed_counter(&state, FeedKey::Board(board)).await))
}

/// Frames of a thread feed in `[start, end)`, joined with `\0`.
///
/// An empty range is `204 No Content`. The body is cached by its SHA-256.
pub async fn get_backlog(
    State(state): State<Arc<AppState>>,
    Path((thread, start, end)): Path<(u64, u64, u64)>,
    headers: HeaderMap,
) -> Response {
    let Ok(thread) = ThreadId::new(thread) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    backlog(&state, FeedKey::Thread(thread), start, end, &headers).await
}

/// Frames of a board feed (or `all`) in `[start, end)`
pub async fn get_board_backlog(
    State(state): State<Arc<AppState>>,
    Path((board, start, end)): Path<(String, u64, u64)>,
    headers: HeaderMap,
) -> Response {
    let Ok(board) = BoardId::new(board) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    backlog(&state, FeedKey::Board(board), start, end, &headers).await
}

async fn backlog(
    state: &AppState,
    feed: FeedKey,
    start: u64,
    end: u64,
    headers: &HeaderMap,
) -> Response {
    let frames = state.get_backlog_usecase.execute(&feed, start, end).await;
    if frames.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let body = concat_frames(&frames);
    let etag = format!("\"{}\"", sha256_hex(body.as_bytes()));
    let cached = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.split(',').any(|tag| tag.trim() == etag));
    if cached {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response();
    }

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::ETAG, etag),
        ],
        body,
    )
        .into_response()
}

async fn feed_counter(state: &AppState, feed: FeedKey) -> FeedCounterDto {
    let feed_state = state.get_feed_state_usecase.execute(&feed).await;
    FeedCounterDto {
        feed: feed.to_string(),
        counter: feed_state.counter,
        synced: feed_state.synced,
    }
}

fn status_of(e: &RepositoryError) -> StatusCode {
    match e {
        RepositoryError::ThreadNotFound(_) | RepositoryError::PostNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        _ => {
            tracing::error!("Store error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut s = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        // テスト項目: SHA-256 が 16 進小文字 64 文字で得られる
        // given (前提条件):
        let data = b"abc";

        // when (操作):
        let hex = sha256_hex(data);

        // then (期待する結果):
        assert_eq!(
            hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_missing_thread_is_not_found() {
        // テスト項目: 存在しないスレッド・投稿は 404、それ以外のストアエラーは 500
        // given (前提条件):
        let missing = RepositoryError::ThreadNotFound(ThreadId::new(1).unwrap());
        let closed = RepositoryError::PostAlreadyClosed(PostId::new(1).unwrap());

        // when (操作):
        let statuses = (status_of(&missing), status_of(&closed));

        // then (期待する結果):
        assert_eq!(statuses, (StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR));
    }
}
