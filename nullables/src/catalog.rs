//! Nullable catalog store: thread-safe in-memory durable store for testing.

use hotness_store::{CatalogStore, StoreError};
use hotness_types::ItemId;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// An in-memory catalog of item counters.
///
/// Failures can be injected for the whole store or for individual items, and
/// every successful `apply_delta` is recorded for assertions.
pub struct NullCatalogStore {
    counters: Mutex<BTreeMap<ItemId, u64>>,
    failing_items: Mutex<HashSet<ItemId>>,
    offline: AtomicBool,
    applied: Mutex<Vec<(ItemId, u64)>>,
    apply_calls: AtomicUsize,
}

impl NullCatalogStore {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(BTreeMap::new()),
            failing_items: Mutex::new(HashSet::new()),
            offline: AtomicBool::new(false),
            applied: Mutex::new(Vec::new()),
            apply_calls: AtomicUsize::new(0),
        }
    }

    /// Build a catalog pre-populated with `(item, count)` rows.
    pub fn with_items(items: impl IntoIterator<Item = (ItemId, u64)>) -> Self {
        let store = Self::new();
        store.counters.lock().unwrap().extend(items);
        store
    }

    pub fn insert_item(&self, item: ItemId, count: u64) {
        self.counters.lock().unwrap().insert(item, count);
    }

    pub fn remove_item(&self, item: ItemId) {
        self.counters.lock().unwrap().remove(&item);
    }

    /// Current counter, bypassing failure injection.
    pub fn counter(&self, item: ItemId) -> Option<u64> {
        self.counters.lock().unwrap().get(&item).copied()
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make calls touching `item` fail with [`StoreError::Backend`].
    pub fn fail_item(&self, item: ItemId) {
        self.failing_items.lock().unwrap().insert(item);
    }

    pub fn heal_item(&self, item: ItemId) {
        self.failing_items.lock().unwrap().remove(&item);
    }

    /// Successful `apply_delta` calls, in order.
    pub fn applied(&self) -> Vec<(ItemId, u64)> {
        self.applied.lock().unwrap().clone()
    }

    /// Every `apply_delta` call, including failed ones.
    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    fn check(&self, item: Option<ItemId>) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("catalog offline".into()));
        }
        if let Some(item) = item {
            if self.failing_items.lock().unwrap().contains(&item) {
                return Err(StoreError::Backend(format!("injected failure for item {item}")));
            }
        }
        Ok(())
    }
}

impl Default for NullCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore for NullCatalogStore {
    fn read_counter(&self, item: ItemId) -> Result<Option<u64>, StoreError> {
        self.check(Some(item))?;
        Ok(self.counter(item))
    }

    fn apply_delta(&self, item: ItemId, delta: u64) -> Result<u64, StoreError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Some(item))?;
        let mut counters = self.counters.lock().unwrap();
        match counters.get_mut(&item) {
            Some(count) => {
                *count = count.saturating_add(delta);
                self.applied.lock().unwrap().push((item, delta));
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn read_all_counters(&self) -> Result<Vec<(ItemId, u64)>, StoreError> {
        self.check(None)?;
        Ok(self
            .counters
            .lock()
            .unwrap()
            .iter()
            .map(|(item, count)| (*item, *count))
            .collect())
    }
}
