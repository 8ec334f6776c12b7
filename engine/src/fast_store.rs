//! Handles to the shared fast store, with a per-call timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hotness_store::{CounterStore, DedupGuard, RankingIndex, StoreError};

/// The three fast-store capabilities the engine uses, plus the deadline every
/// call runs under.
///
/// A call that exceeds the deadline fails with [`StoreError::Timeout`], which
/// callers treat exactly like an unreachable store.
#[derive(Clone)]
pub struct FastStore {
    pub counters: Arc<dyn CounterStore>,
    pub ranking: Arc<dyn RankingIndex>,
    pub dedup: Arc<dyn DedupGuard>,
    timeout: Duration,
}

impl FastStore {
    pub fn new(
        counters: Arc<dyn CounterStore>,
        ranking: Arc<dyn RankingIndex>,
        dedup: Arc<dyn DedupGuard>,
        timeout: Duration,
    ) -> Self {
        Self {
            counters,
            ranking,
            dedup,
            timeout,
        }
    }

    /// Use one backend for counters, ranking and dedup markers.
    pub fn shared<S>(store: Arc<S>, timeout: Duration) -> Self
    where
        S: CounterStore + RankingIndex + DedupGuard + 'static,
    {
        let counters: Arc<dyn CounterStore> = store.clone();
        let ranking: Arc<dyn RankingIndex> = store.clone();
        let dedup: Arc<dyn DedupGuard> = store;
        Self::new(counters, ranking, dedup, timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a fast-store call under the configured deadline.
    pub async fn call<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}
