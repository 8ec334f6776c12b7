//! Dedup marker table with per-marker expiry.
//!
//! Expired markers are treated as absent on lookup and dropped for good by
//! [`DedupGuard::purge_expired`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use hotness_store::{DedupGuard, StoreError};
use hotness_types::{Clock, ItemId, OriginatorId, Timestamp};

use crate::MemoryFastStore;

pub(crate) struct MarkerTable {
    expiries: Mutex<HashMap<(ItemId, OriginatorId), Timestamp>>,
    clock: Arc<dyn Clock>,
}

impl MarkerTable {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            expiries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.expiries.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<(ItemId, OriginatorId), Timestamp>>, StoreError> {
        self.expiries
            .lock()
            .map_err(|_| StoreError::Backend("marker lock poisoned".into()))
    }
}

#[async_trait]
impl DedupGuard for MemoryFastStore {
    async fn mark_if_absent(
        &self,
        item: ItemId,
        originator: &OriginatorId,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.markers.clock.now();
        let expires_at = now.plus_millis(ttl.as_millis() as u64);
        let mut expiries = self.markers.lock()?;
        match expiries.get_mut(&(item, originator.clone())) {
            Some(existing) if !existing.is_reached(now) => Ok(false),
            Some(existing) => {
                *existing = expires_at;
                Ok(true)
            }
            None => {
                expiries.insert((item, originator.clone()), expires_at);
                Ok(true)
            }
        }
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.markers.clock.now();
        let mut expiries = self.markers.lock()?;
        let before = expiries.len();
        expiries.retain(|_, expires_at| !expires_at.is_reached(now));
        let removed = before - expiries.len();
        if removed > 0 {
            tracing::trace!(removed, remaining = expiries.len(), "purged dedup markers");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StepClock(AtomicU64);

    impl Clock for StepClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.0.load(Ordering::SeqCst))
        }
    }

    fn setup() -> (Arc<StepClock>, MemoryFastStore) {
        let clock = Arc::new(StepClock(AtomicU64::new(10_000)));
        let store = MemoryFastStore::with_clock(clock.clone());
        (clock, store)
    }

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    const WINDOW: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn second_mark_inside_window_is_rejected() {
        let (clock, store) = setup();
        let sess = OriginatorId::new("sess-1").unwrap();
        assert!(store.mark_if_absent(id(42), &sess, WINDOW).await.unwrap());
        clock.0.fetch_add(500, Ordering::SeqCst);
        assert!(!store.mark_if_absent(id(42), &sess, WINDOW).await.unwrap());
    }

    #[tokio::test]
    async fn mark_succeeds_again_after_window() {
        let (clock, store) = setup();
        let sess = OriginatorId::new("sess-1").unwrap();
        assert!(store.mark_if_absent(id(42), &sess, WINDOW).await.unwrap());
        clock.0.fetch_add(1_000, Ordering::SeqCst);
        assert!(store.mark_if_absent(id(42), &sess, WINDOW).await.unwrap());
    }

    #[tokio::test]
    async fn markers_are_per_pair() {
        let (_clock, store) = setup();
        let a = OriginatorId::new("a").unwrap();
        let b = OriginatorId::new("b").unwrap();
        assert!(store.mark_if_absent(id(1), &a, WINDOW).await.unwrap());
        assert!(store.mark_if_absent(id(1), &b, WINDOW).await.unwrap());
        assert!(store.mark_if_absent(id(2), &a, WINDOW).await.unwrap());
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let (clock, store) = setup();
        let a = OriginatorId::new("a").unwrap();
        store.mark_if_absent(id(1), &a, WINDOW).await.unwrap();
        store
            .mark_if_absent(id(2), &a, Duration::from_secs(10))
            .await
            .unwrap();
        clock.0.fetch_add(2_000, Ordering::SeqCst);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.marker_count(), 1);
    }
}
