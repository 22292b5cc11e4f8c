//! Server state shared by every handler and connection.

use std::sync::Arc;

use kakiko_shared::time::Clock;

use crate::{
    config::ServerConfig,
    domain::{ClientRegistry, Ident, PostStore, UpdateFeed},
    usecase::{
        ComposeSettings, GetBacklogUseCase, GetFeedStateUseCase, GetPostUseCase, GetThreadUseCase,
        PostComposer, SynchroniseUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// PostStore（正規ストアの抽象化）
    pub store: Arc<dyn PostStore>,
    /// UpdateFeed（フィードログの抽象化）
    pub feed: Arc<dyn UpdateFeed>,
    /// ClientRegistry（接続中クライアントの抽象化）
    pub registry: Arc<dyn ClientRegistry>,
    pub clock: Arc<dyn Clock>,
    /// SynchroniseUseCase（フィード同期のユースケース）
    pub synchronise_usecase: Arc<SynchroniseUseCase>,
    /// GetBacklogUseCase（バックログ取得のユースケース）
    pub get_backlog_usecase: Arc<GetBacklogUseCase>,
    /// GetFeedStateUseCase（フィード状態取得のユースケース）
    pub get_feed_state_usecase: Arc<GetFeedStateUseCase>,
    /// GetThreadUseCase（スレッド取得のユースケース）
    pub get_thread_usecase: Arc<GetThreadUseCase>,
    /// GetPostUseCase（投稿取得のユースケース）
    pub get_post_usecase: Arc<GetPostUseCase>,
}

impl AppState {
    /// Wire the use cases on top of the given collaborators
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn PostStore>,
        feed: Arc<dyn UpdateFeed>,
        registry: Arc<dyn ClientRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            synchronise_usecase: Arc::new(SynchroniseUseCase::new(
                store.clone(),
                feed.clone(),
                registry.clone(),
            )),
            get_backlog_usecase: Arc::new(GetBacklogUseCase::new(feed.clone())),
            get_feed_state_usecase: Arc::new(GetFeedStateUseCase::new(
                feed.clone(),
                registry.clone(),
            )),
            get_thread_usecase: Arc::new(GetThreadUseCase::new(store.clone(), feed.clone())),
            get_post_usecase: Arc::new(GetPostUseCase::new(store.clone())),
            config,
            store,
            feed,
            registry,
            clock,
        }
    }

    /// Fresh composer for one connection
    pub fn composer(&self, ident: Ident) -> PostComposer {
        PostComposer::new(
            self.store.clone(),
            self.feed.clone(),
            self.clock.clone(),
            ident,
            ComposeSettings {
                expiry: self.config.post_expiry,
                max_body_len: self.config.max_body_len,
            },
        )
    }
}
