//! InMemory PostStore 実装
//!
//! ドメイン層が定義する PostStore trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! 永続化はしないため、サーバーを再起動するとスレッドと投稿は失われます。

use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    BoardId, Post, PostId, PostStore, RepositoryError, Thread, ThreadId, Timestamp,
};

#[derive(Debug)]
struct ThreadRecord {
    board: BoardId,
    subject: String,
    created_at: Timestamp,
    posts: Vec<PostId>,
}

#[derive(Debug, Default)]
struct StoreState {
    threads: HashMap<ThreadId, ThreadRecord>,
    posts: HashMap<PostId, Post>,
    boards: HashSet<BoardId>,
    last_thread_id: Option<ThreadId>,
    last_post_id: Option<PostId>,
}

/// インメモリ PostStore 実装
///
/// スレッドと投稿の ID はそれぞれ 1 から連番で払い出します（0 は「投稿なし」を表すため使わない）。
#[derive(Debug, Default)]
pub struct InMemoryPostStore {
    state: Mutex<StoreState>,
}

impl InMemoryPostStore {
    /// 空の InMemoryPostStore を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn get_thread(&self, id: ThreadId) -> Result<Thread, RepositoryError> {
        let state = self.state.lock().await;
        let record = state
            .threads
            .get(&id)
            .ok_or(RepositoryError::ThreadNotFound(id))?;

        let posts = record
            .posts
            .iter()
            .filter_map(|post_id| state.posts.get(post_id).cloned())
            .collect();

        Ok(Thread {
            id,
            board: record.board.clone(),
            subject: record.subject.clone(),
            created_at: record.created_at,
            posts,
        })
    }

    async fn get_post(&self, id: PostId) -> Result<Post, RepositoryError> {
        let state = self.state.lock().await;
        state
            .posts
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::PostNotFound(id))
    }

    async fn create_thread(
        &self,
        board: BoardId,
        subject: String,
        created_at: Timestamp,
    ) -> Result<ThreadId, RepositoryError> {
        let mut state = self.state.lock().await;
        let id = state.last_thread_id.map_or(ThreadId::FIRST, ThreadId::next);
        state.last_thread_id = Some(id);
        state.boards.insert(board.clone());
        state.threads.insert(
            id,
            ThreadRecord {
                board,
                subject,
                created_at,
                posts: Vec::new(),
            },
        );
        tracing::debug!("Thread {} created", id);
        Ok(id)
    }

    async fn board_exists(&self, board: &BoardId) -> Result<bool, RepositoryError> {
        Ok(self.state.lock().await.boards.contains(board))
    }

    async fn insert_post(
        &self,
        thread: ThreadId,
        board: BoardId,
        ip: IpAddr,
        created_at: Timestamp,
    ) -> Result<PostId, RepositoryError> {
        let mut state = self.state.lock().await;
        let record = state
            .threads
            .get(&thread)
            .ok_or(RepositoryError::ThreadNotFound(thread))?;
        if record.board != board {
            return Err(RepositoryError::BoardMismatch { thread, board });
        }

        let id = state.last_post_id.map_or(PostId::FIRST, PostId::next);
        state.last_post_id = Some(id);
        state.posts.insert(
            id,
            Post {
                id,
                thread,
                board,
                body: String::new(),
                ip,
                created_at,
                editing: true,
            },
        );
        if let Some(record) = state.threads.get_mut(&thread) {
            record.posts.push(id);
        }
        Ok(id)
    }

    async fn close_post(&self, id: PostId, body: String) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .get_mut(&id)
            .ok_or(RepositoryError::PostNotFound(id))?;
        if !post.editing {
            return Err(RepositoryError::PostAlreadyClosed(id));
        }
        post.body = body;
        post.editing = false;
        Ok(())
    }
}
