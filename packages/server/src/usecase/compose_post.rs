//! UseCase: 編集中の投稿（Open Post）の処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PostComposer の begin / append / backspace / splice / close
//! - 29 分を超えた投稿の遅延期限切れ（次のアクセス時に確定される）
//!
//! ### なぜこのテストが必要か
//! - 投稿のライフサイクルイベントはフィードに一度だけ追記されなければならない
//! - 期限切れ・切断時にも本文が失われず確定されることを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：投稿を開始し、追記して確定する
//! - 異常系：二重の開始、未開始での編集、期限切れ、ストアのエラー
//! - エッジケース：投稿がない状態での close（冪等）

use std::{sync::Arc, time::Duration};

use kakiko_shared::time::Clock;
use serde::Serialize;

use crate::{
    domain::{
        BoardId, FeedKey, Ident, OpenPost, PostId, PostStore, ThreadId, Timestamp, UpdateFeed,
    },
    infrastructure::dto::{
        codec::encode,
        websocket::{
            AppendEvent, MessageType, PostCreatedEvent, PostEvent, SpliceEvent, SpliceRequest,
        },
    },
};

use super::error::ComposeError;

/// Limits applied to every open post
#[derive(Debug, Clone, Copy)]
pub struct ComposeSettings {
    pub expiry: Duration,
    pub max_body_len: usize,
}

/// Staging buffer for the post one connection is composing.
///
/// Owned by exactly one connection; never shared between tasks.
pub struct PostComposer {
    store: Arc<dyn PostStore>,
    feed: Arc<dyn UpdateFeed>,
    clock: Arc<dyn Clock>,
    ident: Ident,
    settings: ComposeSettings,
    open: Option<OpenPost>,
}

impl PostComposer {
    /// 新しい PostComposer を作成
    pub fn new(
        store: Arc<dyn PostStore>,
        feed: Arc<dyn UpdateFeed>,
        clock: Arc<dyn Clock>,
        ident: Ident,
        settings: ComposeSettings,
    ) -> Self {
        Self {
            store,
            feed,
            clock,
            ident,
            settings,
            open: None,
        }
    }

    pub fn open_post(&self) -> Option<&OpenPost> {
        self.open.as_ref()
    }

    /// Open a new post in `thread` and announce it on the thread's feeds
    pub async fn begin(
        &mut self,
        thread: ThreadId,
        board: BoardId,
    ) -> Result<PostId, ComposeError> {
        if let Some(post) = &self.open {
            return Err(ComposeError::PostAlreadyOpen(post.id));
        }

        let now = self.now();
        let id = self
            .store
            .insert_post(thread, board.clone(), self.ident.ip, now)
            .await?;
        let post = OpenPost::new(id, thread, board, now);

        let event = PostCreatedEvent::from(&post);
        for feed in lifecycle_feeds(&post) {
            self.publish(&feed, MessageType::InsertPost, &event).await;
        }
        tracing::info!("Post {} opened in thread {} by {}", id, thread, self.ident.ip);
        self.open = Some(post);
        Ok(id)
    }

    /// Append text to the open post
    pub async fn append(&mut self, text: String) -> Result<(), ComposeError> {
        self.ensure_fresh().await?;
        let max = self.settings.max_body_len;
        let post = self.open.as_mut().ok_or(ComposeError::NoPostOpen)?;
        post.append(&text, max)?;

        let feed = FeedKey::Thread(post.thread);
        let event = AppendEvent { id: post.id, text };
        self.publish(&feed, MessageType::Append, &event).await;
        Ok(())
    }

    /// Remove the last character of the open post
    pub async fn backspace(&mut self) -> Result<(), ComposeError> {
        self.ensure_fresh().await?;
        let post = self.open.as_mut().ok_or(ComposeError::NoPostOpen)?;
        if !post.backspace() {
            return Ok(());
        }

        let feed = FeedKey::Thread(post.thread);
        let event = PostEvent { id: post.id };
        self.publish(&feed, MessageType::Backspace, &event).await;
        Ok(())
    }

    /// Replace a character range of the open post
    pub async fn splice(&mut self, request: SpliceRequest) -> Result<(), ComposeError> {
        self.ensure_fresh().await?;
        let max = self.settings.max_body_len;
        let post = self.open.as_mut().ok_or(ComposeError::NoPostOpen)?;
        post.splice(request.start, request.len, &request.text, max)?;

        let feed = FeedKey::Thread(post.thread);
        let event = SpliceEvent {
            id: post.id,
            start: request.start,
            len: request.len,
            text: request.text,
        };
        self.publish(&feed, MessageType::Splice, &event).await;
        Ok(())
    }

    /// Flush the open post to the store and announce it closed.
    /// Does nothing when no post is open. The post stays open if the store
    /// rejects the flush.
    pub async fn close(&mut self) -> Result<(), ComposeError> {
        let Some(post) = &self.open else {
            return Ok(());
        };

        let id = post.id;
        let feeds = lifecycle_feeds(post);
        self.store.close_post(id, post.body().to_string()).await?;
        self.open = None;

        let event = PostEvent { id };
        for feed in feeds {
            self.publish(&feed, MessageType::ClosePost, &event).await;
        }
        tracing::info!("Post {} closed", id);
        Ok(())
    }

    /// Close the open post if it outlived the expiry. Returns whether it did.
    pub async fn expire_if_stale(&mut self) -> Result<bool, ComposeError> {
        let now = self.now();
        let expired = self
            .open
            .as_ref()
            .is_some_and(|post| post.is_expired(now, self.expiry_millis()));
        if expired {
            tracing::info!("Closing expired post");
            self.close().await?;
        }
        Ok(expired)
    }

    async fn ensure_fresh(&mut self) -> Result<(), ComposeError> {
        let now = self.now();
        let expired = match &self.open {
            None => return Err(ComposeError::NoPostOpen),
            Some(post) => post.is_expired(now, self.expiry_millis()),
        };
        if expired {
            self.close().await?;
            return Err(ComposeError::PostExpired);
        }
        Ok(())
    }

    async fn publish<T: Serialize + Sync>(&self, feed: &FeedKey, typ: MessageType, payload: &T) {
        match encode(typ, payload) {
            Ok(frame) => {
                self.feed.append(feed, frame).await;
            }
            Err(e) => {
                tracing::error!("Failed to encode {:?} for {}: {}", typ, feed, e);
            }
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    fn expiry_millis(&self) -> i64 {
        i64::try_from(self.settings.expiry.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Feeds that see a post being opened and closed: its thread, its board and
/// the `all` aggregate board
fn lifecycle_feeds(post: &OpenPost) -> Vec<FeedKey> {
    let mut feeds = vec![
        FeedKey::Thread(post.thread),
        FeedKey::Board(post.board.clone()),
    ];
    if !post.board.is_all() {
        feeds.push(FeedKey::Board(BoardId::all()));
    }
    feeds
}
