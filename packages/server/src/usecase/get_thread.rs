//! UseCase: スレッド・投稿の取得

use std::sync::Arc;

use crate::domain::{
    Counter, FeedKey, Post, PostId, PostStore, RepositoryError, Thread, ThreadId, UpdateFeed,
};

/// スレッド取得のユースケース
pub struct GetThreadUseCase {
    store: Arc<dyn PostStore>,
    feed: Arc<dyn UpdateFeed>,
}

impl GetThreadUseCase {
    pub fn new(store: Arc<dyn PostStore>, feed: Arc<dyn UpdateFeed>) -> Self {
        Self { store, feed }
    }

    /// スレッドとその時点のフィードカウンタを取得する
    ///
    /// カウンタはスレッドより先に読む。間に追記されたイベントはクライアントが
    /// 重複して再生することはあっても、取りこぼすことはない。
    pub async fn execute(&self, id: ThreadId) -> Result<(Thread, Counter), RepositoryError> {
        let counter = self.feed.current_counter(&FeedKey::Thread(id)).await;
        let thread = self.store.get_thread(id).await?;
        Ok((thread, counter))
    }
}

/// 投稿取得のユースケース
pub struct GetPostUseCase {
    store: Arc<dyn PostStore>,
}

impl GetPostUseCase {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, id: PostId) -> Result<Post, RepositoryError> {
        self.store.get_post(id).await
    }
}
