//! UseCase: バックログ（切断中に取りこぼしたメッセージ）とフィード状態の取得

use std::sync::Arc;

use crate::domain::{ClientRegistry, Counter, FeedKey, UpdateFeed};

/// バックログ取得のユースケース
pub struct GetBacklogUseCase {
    feed: Arc<dyn UpdateFeed>,
}

impl GetBacklogUseCase {
    pub fn new(feed: Arc<dyn UpdateFeed>) -> Self {
        Self { feed }
    }

    /// フィードから `[start, end)` のフレームを取得する
    ///
    /// `end` は現在のカウンタで切り詰められる。範囲が空、または保持範囲より
    /// 古い場合は空を返す。
    pub async fn execute(&self, feed: &FeedKey, start: Counter, end: Counter) -> Vec<String> {
        let frames = self.feed.range(feed, start, end).await;
        tracing::debug!(
            "Backlog of {} [{}, {}): {} frames",
            feed,
            start,
            end,
            frames.len()
        );
        frames
    }
}

/// Counter and synced-client count of one feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedState {
    pub counter: Counter,
    pub synced: usize,
}

/// フィード状態取得のユースケース
pub struct GetFeedStateUseCase {
    feed: Arc<dyn UpdateFeed>,
    registry: Arc<dyn ClientRegistry>,
}

impl GetFeedStateUseCase {
    pub fn new(feed: Arc<dyn UpdateFeed>, registry: Arc<dyn ClientRegistry>) -> Self {
        Self { feed, registry }
    }

    pub async fn execute(&self, feed: &FeedKey) -> FeedState {
        FeedState {
            counter: self.feed.current_counter(feed).await,
            synced: self.registry.count_synced(feed).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{BoardId, ThreadId},
        infrastructure::{feed::InMemoryUpdateFeed, registry::ChannelClientRegistry},
    };

    fn setup() -> (Arc<InMemoryUpdateFeed>, Arc<ChannelClientRegistry>) {
        let registry = Arc::new(ChannelClientRegistry::new());
        let feed = Arc::new(InMemoryUpdateFeed::new(registry.clone(), None));
        (feed, registry)
    }

    #[tokio::test]
    async fn test_backlog_returns_missed_frames() {
        // テスト項目: 最後に見たカウンタ 5、現在 8 のとき 3 件のフレームが返る
        // given (前提条件):
        let (feed, _registry) = setup();
        let thread = ThreadId::new(42).unwrap();
        for i in 0..8 {
            feed.append(&FeedKey::Thread(thread), format!("03{{\"n\":{i}}}"))
                .await;
        }
        let usecase = GetBacklogUseCase::new(feed);

        // when (操作):
        let frames = usecase.execute(&FeedKey::Thread(thread), 5, 8).await;

        // then (期待する結果):
        assert_eq!(frames, vec!["03{\"n\":5}", "03{\"n\":6}", "03{\"n\":7}"]);
    }

    #[tokio::test]
    async fn test_backlog_of_other_feeds_is_not_visible() {
        // テスト項目: 別スレッドや板のフィードのフレームは返らない
        // given (前提条件):
        let (feed, _registry) = setup();
        let thread = ThreadId::new(1).unwrap();
        feed.append(&FeedKey::Thread(ThreadId::new(2).unwrap()), "03x".to_string())
            .await;
        feed.append(&FeedKey::Board(BoardId::all()), "06y".to_string()).await;
        let usecase = GetBacklogUseCase::new(feed);

        // when (操作):
        let frames = usecase.execute(&FeedKey::Thread(thread), 0, 10).await;

        // then (期待する結果):
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn test_backlog_of_board_feed() {
        // テスト項目: 板のフィードも同じようにバックログを取得できる
        // given (前提条件):
        let (feed, _registry) = setup();
        let board = FeedKey::Board(BoardId::new("b".to_string()).unwrap());
        feed.append(&board, "02a".to_string()).await;
        feed.append(&board, "06b".to_string()).await;
        feed.append(&FeedKey::Board(BoardId::all()), "02a".to_string()).await;
        let usecase = GetBacklogUseCase::new(feed);

        // when (操作):
        let frames = usecase.execute(&board, 1, 2).await;

        // then (期待する結果):
        assert_eq!(frames, vec!["06b"]);
    }

    #[tokio::test]
    async fn test_feed_state() {
        // テスト項目: フィード状態はカウンタと同期中クライアント数を返す
        // given (前提条件):
        let (feed, registry) = setup();
        let key = FeedKey::Board(BoardId::all());
        feed.append(&key, "02a".to_string()).await;
        feed.append(&key, "06b".to_string()).await;
        let usecase = GetFeedStateUseCase::new(feed, registry);

        // when (操作):
        let state = usecase.execute(&key).await;

        // then (期待する結果):
        assert_eq!(state, FeedState { counter: 2, synced: 0 });
    }
}
