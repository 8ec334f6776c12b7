//! Nullable fast store: an in-memory fast store that can be taken offline.

use async_trait::async_trait;
use hotness_store::{CounterStore, DedupGuard, RankingIndex, StoreError};
use hotness_store_memory::MemoryFastStore;
use hotness_types::{Clock, ItemId, OriginatorId, RankingEntry};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Wraps a [`MemoryFastStore`] with outage and latency injection.
///
/// While offline every call fails with [`StoreError::Unavailable`]. A non-zero
/// latency makes every call sleep first, which lets tests drive the engine's
/// fast-store timeout.
pub struct FlakyFastStore {
    inner: MemoryFastStore,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicUsize,
    batch_reads: AtomicUsize,
}

impl FlakyFastStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: MemoryFastStore::with_clock(clock),
            offline: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
            batch_reads: AtomicUsize::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Total calls received, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `get_many` calls received.
    pub fn batch_reads(&self) -> usize {
        self.batch_reads.load(Ordering::SeqCst)
    }

    /// The wrapped store, for arranging state without failure injection.
    pub fn inner(&self) -> &MemoryFastStore {
        &self.inner
    }

    async fn gate(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("fast store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for FlakyFastStore {
    async fn increment(&self, item: ItemId) -> Result<u64, StoreError> {
        self.gate().await?;
        self.inner.increment(item).await
    }

    async fn get(&self, item: ItemId) -> Result<Option<u64>, StoreError> {
        self.gate().await?;
        self.inner.get(item).await
    }

    async fn get_many(&self, items: &[ItemId]) -> Result<Vec<Option<u64>>, StoreError> {
        self.batch_reads.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.get_many(items).await
    }

    async fn seed_if_absent(&self, item: ItemId, count: u64) -> Result<bool, StoreError> {
        self.gate().await?;
        self.inner.seed_if_absent(item, count).await
    }

    async fn pending_items(&self) -> Result<Vec<ItemId>, StoreError> {
        self.gate().await?;
        self.inner.pending_items().await
    }

    async fn pending_delta(&self, item: ItemId) -> Result<i64, StoreError> {
        self.gate().await?;
        self.inner.pending_delta(item).await
    }

    async fn subtract_pending(&self, item: ItemId, delta: i64) -> Result<i64, StoreError> {
        self.gate().await?;
        self.inner.subtract_pending(item, delta).await
    }

    async fn reset_pending(&self, item: ItemId) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.reset_pending(item).await
    }
}

#[async_trait]
impl RankingIndex for FlakyFastStore {
    async fn increment_score(&self, item: ItemId, by: u64) -> Result<u64, StoreError> {
        self.gate().await?;
        self.inner.increment_score(item, by).await
    }

    async fn set_score(&self, item: ItemId, score: u64) -> Result<(), StoreError> {
        self.gate().await?;
        self.inner.set_score(item, score).await
    }

    async fn score(&self, item: ItemId) -> Result<Option<u64>, StoreError> {
        self.gate().await?;
        self.inner.score(item).await
    }

    async fn top(&self, n: usize) -> Result<Vec<RankingEntry>, StoreError> {
        self.gate().await?;
        self.inner.top(n).await
    }
}

#[async_trait]
impl DedupGuard for FlakyFastStore {
    async fn mark_if_absent(
        &self,
        item: ItemId,
        originator: &OriginatorId,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.gate().await?;
        self.inner.mark_if_absent(item, originator, ttl).await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.gate().await?;
        self.inner.purge_expired().await
    }
}
