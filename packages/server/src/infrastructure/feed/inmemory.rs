//! InMemory UpdateFeed 実装
//!
//! フィードごとに追記専用のログ（エンコード済みフレーム列）を保持し、
//! 追記と同時にレジストリ経由で同期済みクライアントへ配信します。
//!
//! ## 順序保証
//!
//! 追記・配信・購読はフィード単位の Mutex の中で行います。
//! - 追記順 = 配信順 = `range` で返る順序
//! - 購読時に返すカウンタより前のフレームは配信されず、以降のフレームは必ず配信される
//!
//! 異なるフィードへの追記は互いにブロックしません。

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{ClientId, ClientRegistry, Counter, FeedKey, PushError, UpdateFeed};

/// Retained suffix of one feed. Indices stay absolute after truncation.
#[derive(Debug, Default)]
struct FeedLog {
    /// Index of `entries[0]`
    base: Counter,
    entries: VecDeque<String>,
}

impl FeedLog {
    fn counter(&self) -> Counter {
        self.base + self.entries.len() as Counter
    }

    fn push(&mut self, frame: String, retention: Option<usize>) -> Counter {
        let index = self.counter();
        self.entries.push_back(frame);
        if let Some(max) = retention {
            while self.entries.len() > max {
                self.entries.pop_front();
                self.base += 1;
            }
        }
        index
    }

    fn range(&self, start: Counter, end: Counter) -> Vec<String> {
        let end = end.min(self.counter());
        // A partial slice would hide a gap from the client
        if start >= end || start < self.base {
            return Vec::new();
        }
        let from = (start - self.base) as usize;
        let to = (end - self.base) as usize;
        self.entries.range(from..to).cloned().collect()
    }
}

/// インメモリ UpdateFeed 実装
///
/// ログは最初の append で作られる。購読や読み取りでは作らない。
pub struct InMemoryUpdateFeed {
    logs: RwLock<HashMap<FeedKey, Arc<Mutex<FeedLog>>>>,
    registry: Arc<dyn ClientRegistry>,
    /// Entries kept per feed; `None` keeps everything
    retention: Option<usize>,
}

impl InMemoryUpdateFeed {
    /// 新しい InMemoryUpdateFeed を作成
    ///
    /// # Arguments
    ///
    /// * `registry` - 追記したフレームの配信先
    /// * `retention` - フィードごとに保持する最大件数（`None` なら無制限）
    pub fn new(registry: Arc<dyn ClientRegistry>, retention: Option<usize>) -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
            registry,
            retention,
        }
    }

    async fn existing_log(&self, feed: &FeedKey) -> Option<Arc<Mutex<FeedLog>>> {
        self.logs.read().await.get(feed).cloned()
    }

    async fn log(&self, feed: &FeedKey) -> Arc<Mutex<FeedLog>> {
        if let Some(log) = self.existing_log(feed).await {
            return log;
        }
        let mut logs = self.logs.write().await;
        logs.entry(feed.clone()).or_default().clone()
    }
}

#[async_trait]
impl UpdateFeed for InMemoryUpdateFeed {
    async fn append(&self, feed: &FeedKey, frame: String) -> Counter {
        let log = self.log(feed).await;
        let mut log = log.lock().await;
        self.registry.broadcast(feed, &frame).await;
        let index = log.push(frame, self.retention);
        tracing::debug!("Appended entry {} to {}", index, feed);
        index
    }

    async fn current_counter(&self, feed: &FeedKey) -> Counter {
        match self.existing_log(feed).await {
            Some(log) => log.lock().await.counter(),
            None => 0,
        }
    }

    async fn range(&self, feed: &FeedKey, start: Counter, end: Counter) -> Vec<String> {
        match self.existing_log(feed).await {
            Some(log) => log.lock().await.range(start, end),
            None => Vec::new(),
        }
    }

    async fn subscribe(&self, feed: &FeedKey, client: ClientId) -> Result<Counter, PushError> {
        let logs = self.logs.read().await;
        let Some(log) = logs.get(feed).cloned() else {
            // Creating the first log needs the write lock, so no append can
            // slip in before the subscription is in place
            self.registry.subscribe(&client, feed.clone()).await?;
            return Ok(0);
        };
        drop(logs);
        let log = log.lock().await;
        self.registry.subscribe(&client, feed.clone()).await?;
        Ok(log.counter())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use tokio::sync::{Notify, mpsc};

    use super::*;
    use crate::{
        domain::{ClientHandle, Ident, ThreadId, Timestamp},
        infrastructure::registry::ChannelClientRegistry,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - append が返すカウンタの単調性と range の結果
    // - 範囲外・空範囲の range が空を返すこと（エラーにならない）
    // - 保持件数を超えたログの切り詰め
    // - 切断中に追記されたメッセージをバックログから取り戻すシナリオ
    // - subscribe のカウンタと配信の境界
    // ========================================

    fn thread_feed(id: u64) -> FeedKey {
        FeedKey::Thread(ThreadId::new(id).unwrap())
    }

    fn create_feed(retention: Option<usize>) -> (InMemoryUpdateFeed, Arc<ChannelClientRegistry>) {
        let registry = Arc::new(ChannelClientRegistry::new());
        (InMemoryUpdateFeed::new(registry.clone(), retention), registry)
    }

    async fn connect(
        registry: &ChannelClientRegistry,
    ) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
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
        (id, receiver)
    }

    #[tokio::test]
    async fn test_append_returns_increasing_counters() {
        // テスト項目: 連続した append のカウンタは増加し、range(c1, c2 + 1) で両方が返る
        // given (前提条件):
        let (feed, _registry) = create_feed(None);
        let key = thread_feed(42);

        // when (操作):
        let c1 = feed.append(&key, "f1".to_string()).await;
        let c2 = feed.append(&key, "f2".to_string()).await;

        // then (期待する結果):
        assert!(c1 < c2);
        assert_eq!(feed.range(&key, c1, c2 + 1).await, vec!["f1", "f2"]);
        assert_eq!(feed.current_counter(&key).await, c2 + 1);
    }

    #[tokio::test]
    async fn test_range_edge_cases_return_empty() {
        // テスト項目: start == end、start > 現在のカウンタ、未知のフィードでは空が返る
        // given (前提条件):
        let (feed, _registry) = create_feed(None);
        let key = thread_feed(1);
        feed.append(&key, "a".to_string()).await;
        feed.append(&key, "b".to_string()).await;

        // then (期待する結果):
        assert!(feed.range(&key, 1, 1).await.is_empty());
        assert!(feed.range(&key, 5, 9).await.is_empty());
        assert!(feed.range(&key, 2, 1).await.is_empty());
        assert!(feed.range(&thread_feed(2), 0, 10).await.is_empty());
        // end はカウンタで切り詰められる
        assert_eq!(feed.range(&key, 1, 100).await, vec!["b"]);
    }

    #[tokio::test]
    async fn test_feeds_have_independent_counters() {
        // テスト項目: フィードごとにカウンタは独立している
        // given (前提条件):
        let (feed, _registry) = create_feed(None);

        // when (操作):
        feed.append(&thread_feed(1), "a".to_string()).await;
        feed.append(&thread_feed(1), "b".to_string()).await;
        let other = feed.append(&thread_feed(2), "c".to_string()).await;

        // then (期待する結果):
        assert_eq!(other, 0);
        assert_eq!(feed.current_counter(&thread_feed(1)).await, 2);
        assert_eq!(feed.current_counter(&thread_feed(3)).await, 0);
    }

    #[tokio::test]
    async fn test_retention_truncates_but_keeps_absolute_indices() {
        // テスト項目: 保持件数を超えると古いものから削除され、インデックスは絶対値のまま
        // given (前提条件):
        let (feed, _registry) = create_feed(Some(3));
        let key = thread_feed(1);

        // when (操作):
        for i in 0..5 {
            feed.append(&key, format!("m{}", i)).await;
        }

        // then (期待する結果):
        assert_eq!(feed.current_counter(&key).await, 5);
        assert_eq!(feed.range(&key, 2, 5).await, vec!["m2", "m3", "m4"]);
        // 保持範囲より前から始まる範囲は欠損を隠さないよう空を返す
        assert!(feed.range(&key, 1, 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_backlog_fills_gap_after_disconnect() {
        // テスト項目: 切断中に追記された 3 件がバックログから追記順に取得できる
        // given (前提条件): B が最後に知っているカウンタは 5
        let (feed, _registry) = create_feed(None);
        let key = thread_feed(10);
        for i in 0..5 {
            feed.append(&key, format!("old{}", i)).await;
        }
        let last_known = feed.current_counter(&key).await;

        // when (操作): B の切断中に A が 3 件追記する
        for text in ["x", "y", "z"] {
            feed.append(&key, text.to_string()).await;
        }
        let current = feed.current_counter(&key).await;

        // then (期待する結果):
        assert_eq!(last_known, 5);
        assert_eq!(current, 8);
        assert_eq!(feed.range(&key, last_known, current).await, vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_append_broadcasts_to_subscribers() {
        // テスト項目: append したフレームが購読中のクライアントに追記順で届く
        // given (前提条件):
        let (feed, registry) = create_feed(None);
        let key = thread_feed(1);
        let (alice, mut alice_rx) = connect(&registry).await;
        feed.subscribe(&key, alice).await.unwrap();

        // when (操作):
        feed.append(&key, "first".to_string()).await;
        feed.append(&key, "second".to_string()).await;

        // then (期待する結果):
        assert_eq!(alice_rx.recv().await, Some("first".to_string()));
        assert_eq!(alice_rx.recv().await, Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_subscribe_counter_splits_backlog_and_live() {
        // テスト項目: 購読時のカウンタより前はバックログ、以降はライブ配信で過不足なく届く
        // given (前提条件):
        let (feed, registry) = create_feed(None);
        let key = thread_feed(1);
        feed.append(&key, "before".to_string()).await;
        let (alice, mut alice_rx) = connect(&registry).await;

        // when (操作):
        let counter = feed.subscribe(&key, alice).await.unwrap();
        feed.append(&key, "after".to_string()).await;

        // then (期待する結果):
        assert_eq!(counter, 1);
        assert_eq!(feed.range(&key, 0, counter).await, vec!["before"]);
        assert_eq!(alice_rx.recv().await, Some("after".to_string()));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_unique_counters() {
        // テスト項目: 並行に append してもカウンタが重複しない
        // given (前提条件):
        let (feed, _registry) = create_feed(None);
        let feed = Arc::new(feed);
        let key = thread_feed(1);

        // when (操作):
        let mut tasks = Vec::new();
        for i in 0..50 {
            let feed = feed.clone();
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                feed.append(&key, format!("m{}", i)).await
            }));
        }
        let mut counters = Vec::new();
        for task in tasks {
            counters.push(task.await.unwrap());
        }

        // then (期待する結果):
        counters.sort_unstable();
        assert_eq!(counters, (0..50).collect::<Vec<Counter>>());
    }

    #[tokio::test]
    async fn test_subscribe_to_empty_feed_does_not_create_log() {
        // テスト項目: 追記のないフィードへの購読はログを作らず、カウンタ 0 を返す
        // given (前提条件):
        let (feed, registry) = create_feed(None);
        let (alice, _alice_rx) = connect(&registry).await;

        // when (操作):
        let mut counters = Vec::new();
        for id in 1..=100 {
            counters.push(feed.subscribe(&thread_feed(id), alice).await.unwrap());
        }
        registry.remove(&alice).await;

        // then (期待する結果):
        assert!(counters.iter().all(|counter| *counter == 0));
        assert!(feed.logs.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_before_first_append_receives_it() {
        // テスト項目: ログ作成前に購読したクライアントにも最初の追記が届く
        // given (前提条件):
        let (feed, registry) = create_feed(None);
        let key = thread_feed(1);
        let (alice, mut alice_rx) = connect(&registry).await;
        let counter = feed.subscribe(&key, alice).await.unwrap();

        // when (操作):
        let index = feed.append(&key, "first".to_string()).await;

        // then (期待する結果):
        assert_eq!(counter, 0);
        assert_eq!(index, 0);
        assert_eq!(alice_rx.recv().await, Some("first".to_string()));
    }
}
