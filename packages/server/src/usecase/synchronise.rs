//! UseCase: フィードへの同期処理

use std::sync::Arc;

use crate::domain::{
    BoardId, ClientId, ClientRegistry, Counter, FeedKey, PostStore, RepositoryError,
    UpdateFeed,
};

use super::error::SyncError;

/// Result of a successful synchronisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Feed the client is now synced to
    pub feed: FeedKey,
    /// Feed counter the client is synced at
    pub counter: Counter,
    /// Clients synced to the feed, including this one
    pub synced: usize,
}

/// 同期のユースケース
pub struct SynchroniseUseCase {
    store: Arc<dyn PostStore>,
    feed: Arc<dyn UpdateFeed>,
    registry: Arc<dyn ClientRegistry>,
}

impl SynchroniseUseCase {
    /// 新しい SynchroniseUseCase を作成
    pub fn new(
        store: Arc<dyn PostStore>,
        feed: Arc<dyn UpdateFeed>,
        registry: Arc<dyn ClientRegistry>,
    ) -> Self {
        Self {
            store,
            feed,
            registry,
        }
    }

    /// クライアントを `board` / `thread` のフィードに同期させる。
    /// `thread` が 0 なら板のフィードに同期する。既に別のフィードに同期済みなら切り替える。
    ///
    /// # Returns
    ///
    /// * `Ok(SyncOutcome)` - 同期時点のカウンタ。これより前のメッセージはバックログから取得する
    /// * `Err(SyncError)` - 存在しないスレッド・板、またはクライアントがレジストリに登録されていない
    pub async fn execute(
        &self,
        client: ClientId,
        board: BoardId,
        thread: u64,
    ) -> Result<SyncOutcome, SyncError> {
        let feed = FeedKey::from_sync_target(board.clone(), thread);
        if !self.exists(&board, &feed).await? {
            return Err(SyncError::InvalidTarget(feed));
        }

        let counter = self.feed.subscribe(&feed, client).await?;
        let synced = self.registry.count_synced(&feed).await;
        tracing::info!("Client '{}' synced to {} at counter {}", client, feed, counter);
        Ok(SyncOutcome {
            feed,
            counter,
            synced,
        })
    }

    /// 同期を解除する。未同期なら何もしない
    pub async fn leave(&self, client: &ClientId) {
        if let Some(feed) = self.registry.synced_feed(client).await {
            self.registry.unsubscribe(client).await;
            tracing::info!("Client '{}' left {}", client, feed);
        }
    }

    /// スレッドは `board` 上に存在すること、板はスレッドを持つか `all` であること
    async fn exists(&self, board: &BoardId, feed: &FeedKey) -> Result<bool, SyncError> {
        match feed {
            FeedKey::Thread(id) => match self.store.get_thread(*id).await {
                Ok(thread) => Ok(thread.board == *board),
                Err(RepositoryError::ThreadNotFound(_)) => Ok(false),
                Err(e) => Err(e.into()),
            },
            FeedKey::Board(board) => Ok(board.is_all() || self.store.board_exists(board).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use tokio::sync::{Notify, mpsc};

    use super::*;
    use crate::{
        domain::{ClientHandle, Ident, PushError, ThreadId, Timestamp},
        infrastructure::{
            feed::InMemoryUpdateFeed, registry::ChannelClientRegistry,
            repository::InMemoryPostStore,
        },
    };

    struct Fixture {
        usecase: SynchroniseUseCase,
        feed: Arc<InMemoryUpdateFeed>,
        registry: Arc<ChannelClientRegistry>,
        thread: ThreadId,
    }

    fn board(name: &str) -> BoardId {
        BoardId::new(name.to_string()).unwrap()
    }

    /// 板 "b" にスレッドが 1 つだけある状態
    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryPostStore::new());
        let thread = store
            .create_thread(board("b"), "t".to_string(), Timestamp::new(0))
            .await
            .unwrap();
        let registry = Arc::new(ChannelClientRegistry::new());
        let feed = Arc::new(InMemoryUpdateFeed::new(registry.clone(), None));
        Fixture {
            usecase: SynchroniseUseCase::new(store, feed.clone(), registry.clone()),
            feed,
            registry,
            thread,
        }
    }

    async fn register(registry: &ChannelClientRegistry) -> ClientId {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let id = ClientId::generate();
        registry
            .register(
                id,
                ClientHandle {
                    sender,
                    close: Arc::new(Notify::new()),
                    ident: Ident::new(IpAddr::V4(Ipv4Addr::LOCALHOST), None),
                    connected_at: Timestamp::new(0),
                },
            )
            .await;
        id
    }

    #[tokio::test]
    async fn test_synchronise_reports_counter_and_synced_count() {
        // テスト項目: 同期するとフィードの現在のカウンタと同期数が返る
        // given (前提条件):
        let f = fixture().await;
        let key = FeedKey::Thread(f.thread);
        f.feed.append(&key, "a".to_string()).await;
        f.feed.append(&key, "b".to_string()).await;
        let alice = register(&f.registry).await;
        let bob = register(&f.registry).await;
        f.usecase
            .execute(alice, board("b"), f.thread.value())
            .await
            .unwrap();

        // when (操作):
        let outcome = f
            .usecase
            .execute(bob, board("b"), f.thread.value())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            SyncOutcome {
                feed: key,
                counter: 2,
                synced: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_synchronise_unregistered_client_fails() {
        // テスト項目: 未登録のクライアントは同期できない
        // given (前提条件):
        let f = fixture().await;
        let ghost = ClientId::generate();

        // when (操作):
        let result = f
            .usecase
            .execute(ghost, board("b"), f.thread.value())
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(SyncError::Push(PushError::ClientNotFound(ghost))));
    }

    #[tokio::test]
    async fn test_synchronise_to_unknown_thread_is_rejected() {
        // テスト項目: 存在しないスレッドには同期できず、購読も残らない
        // given (前提条件):
        let f = fixture().await;
        let alice = register(&f.registry).await;
        let missing = FeedKey::Thread(ThreadId::new(999_999).unwrap());

        // when (操作):
        let result = f.usecase.execute(alice, board("b"), 999_999).await;

        // then (期待する結果):
        assert_eq!(result, Err(SyncError::InvalidTarget(missing.clone())));
        assert_eq!(f.registry.synced_feed(&alice).await, None);
        assert_eq!(f.registry.count_synced(&missing).await, 0);
    }

    #[tokio::test]
    async fn test_synchronise_with_wrong_board_is_rejected() {
        // テスト項目: スレッドの板と異なる板を指定した同期は拒否される
        // given (前提条件):
        let f = fixture().await;
        let alice = register(&f.registry).await;

        // when (操作):
        let result = f.usecase.execute(alice, board("g"), f.thread.value()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SyncError::InvalidTarget(FeedKey::Thread(f.thread)))
        );
    }

    #[tokio::test]
    async fn test_synchronise_to_board_feeds() {
        // テスト項目: スレッド 0 は板のフィード。既知の板と "all" は同期でき、未知の板は拒否される
        // given (前提条件):
        let f = fixture().await;
        let alice = register(&f.registry).await;

        // when (操作):
        let known = f.usecase.execute(alice, board("b"), 0).await;
        let all = f.usecase.execute(alice, BoardId::all(), 0).await;
        let unknown = f.usecase.execute(alice, board("g"), 0).await;

        // then (期待する結果):
        assert_eq!(known.unwrap().feed, FeedKey::Board(board("b")));
        assert_eq!(all.unwrap().feed, FeedKey::Board(BoardId::all()));
        assert_eq!(
            unknown,
            Err(SyncError::InvalidTarget(FeedKey::Board(board("g"))))
        );
        // 拒否されても直前の同期は維持される
        assert_eq!(
            f.registry.synced_feed(&alice).await,
            Some(FeedKey::Board(BoardId::all()))
        );
    }

    #[tokio::test]
    async fn test_leave_unsyncs_client() {
        // テスト項目: leave で同期が解除される
        // given (前提条件):
        let f = fixture().await;
        let alice = register(&f.registry).await;
        f.usecase
            .execute(alice, board("b"), f.thread.value())
            .await
            .unwrap();

        // when (操作):
        f.usecase.leave(&alice).await;

        // then (期待する結果):
        assert_eq!(f.registry.synced_feed(&alice).await, None);
        assert_eq!(f.registry.count_synced(&FeedKey::Thread(f.thread)).await, 0);
    }
}
