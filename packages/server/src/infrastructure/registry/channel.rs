//! mpsc チャンネルを使った ClientRegistry 実装
//!
//! ## 責務
//!
//! - 接続中クライアントの `ClientHandle`（送信キュー・close 通知）を管理
//! - フィードごとの同期済みクライアント集合を管理
//! - フレームの配信（broadcast）と close 通知
//!
//! ## 設計ノート
//!
//! 配信はクライアントごとの unbounded キューに積むだけで、書き込みは各接続の
//! 制御ループが行います。遅いクライアントが他のクライアントへの配信を止めることはありません。
//! 詰まったクライアントは書き込み／読み込みのタイムアウトで切断されます。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use kakiko_shared::time::timestamp_to_rfc3339;
use tokio::sync::RwLock;

use crate::domain::{ClientHandle, ClientId, ClientRegistry, FeedKey, PushError};

struct ClientEntry {
    handle: ClientHandle,
    feed: Option<FeedKey>,
}

#[derive(Default)]
struct RegistryState {
    clients: HashMap<ClientId, ClientEntry>,
    feeds: HashMap<FeedKey, HashSet<ClientId>>,
}

impl RegistryState {
    fn detach(&mut self, id: &ClientId, feed: &FeedKey) {
        if let Some(subscribers) = self.feeds.get_mut(feed) {
            subscribers.remove(id);
            if subscribers.is_empty() {
                self.feeds.remove(feed);
            }
        }
    }
}

/// mpsc チャンネルを使った ClientRegistry 実装
#[derive(Default)]
pub struct ChannelClientRegistry {
    state: RwLock<RegistryState>,
}

impl ChannelClientRegistry {
    /// 空の ChannelClientRegistry を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientRegistry for ChannelClientRegistry {
    async fn register(&self, id: ClientId, handle: ClientHandle) {
        let mut state = self.state.write().await;
        state.clients.insert(id, ClientEntry { handle, feed: None });
        tracing::debug!("Client '{}' registered", id);
    }

    async fn remove(&self, id: &ClientId) {
        let mut state = self.state.write().await;
        if let Some(entry) = state.clients.remove(id) {
            if let Some(feed) = &entry.feed {
                state.detach(id, feed);
            }
            tracing::debug!(
                "Client '{}' from {} removed (connected since {})",
                id,
                entry.handle.ident.ip,
                timestamp_to_rfc3339(entry.handle.connected_at.value())
            );
        }
    }

    async fn subscribe(&self, id: &ClientId, feed: FeedKey) -> Result<(), PushError> {
        let mut state = self.state.write().await;
        let previous = {
            let entry = state
                .clients
                .get_mut(id)
                .ok_or(PushError::ClientNotFound(*id))?;
            entry.feed.replace(feed.clone())
        };
        if let Some(previous) = previous {
            state.detach(id, &previous);
        }
        state.feeds.entry(feed.clone()).or_default().insert(*id);
        tracing::debug!("Client '{}' synced to {}", id, feed);
        Ok(())
    }

    async fn unsubscribe(&self, id: &ClientId) {
        let mut state = self.state.write().await;
        let previous = state
            .clients
            .get_mut(id)
            .and_then(|entry| entry.feed.take());
        if let Some(previous) = previous {
            state.detach(id, &previous);
            tracing::debug!("Client '{}' unsynced from {}", id, previous);
        }
    }

    async fn synced_feed(&self, id: &ClientId) -> Option<FeedKey> {
        let state = self.state.read().await;
        state.clients.get(id).and_then(|entry| entry.feed.clone())
    }

    async fn broadcast(&self, feed: &FeedKey, frame: &str) -> usize {
        let state = self.state.read().await;
        let Some(subscribers) = state.feeds.get(feed) else {
            return 0;
        };

        let mut delivered = 0;
        for id in subscribers {
            let Some(entry) = state.clients.get(id) else {
                continue;
            };
            // 一部のクライアントへの失敗は許容する（切断処理中のクライアント）
            if let Err(e) = entry.handle.sender.send(frame.to_string()) {
                tracing::warn!("Failed to queue frame for client '{}': {}", id, e);
            } else {
                delivered += 1;
            }
        }
        tracing::debug!("Broadcasted frame on {} to {} clients", feed, delivered);
        delivered
    }

    async fn count_synced(&self, feed: &FeedKey) -> usize {
        let state = self.state.read().await;
        state.feeds.get(feed).map_or(0, HashSet::len)
    }

    async fn len(&self) -> usize {
        self.state.read().await.clients.len()
    }

    async fn close_all(&self) {
        let state = self.state.read().await;
        for entry in state.clients.values() {
            entry.handle.close.notify_one();
        }
        tracing::info!("Requested close of {} clients", state.clients.len());
    }
}
