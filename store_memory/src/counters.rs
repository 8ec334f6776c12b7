//! Counter table: absolute counts and pending deltas per item.
//!
//! The map is behind an `RwLock` only to insert new items; the counts
//! themselves are atomics, so increments on existing items take the read lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use hotness_store::{CounterStore, StoreError};
use hotness_types::ItemId;

use crate::MemoryFastStore;

struct CounterCell {
    absolute: AtomicU64,
    pending: AtomicI64,
}

impl CounterCell {
    fn new(absolute: u64) -> Self {
        Self {
            absolute: AtomicU64::new(absolute),
            pending: AtomicI64::new(0),
        }
    }

    /// Absolute first, pending second: a concurrent reader never observes
    /// `pending > absolute`.
    fn bump(&self) -> u64 {
        let absolute = self.absolute.fetch_add(1, Ordering::AcqRel) + 1;
        self.pending.fetch_add(1, Ordering::AcqRel);
        absolute
    }
}

pub(crate) struct CounterTable {
    cells: RwLock<HashMap<ItemId, CounterCell>>,
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("counter table lock poisoned".into())
}

impl CounterTable {
    pub(crate) fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.read().map(|c| c.len()).unwrap_or(0)
    }

    fn increment(&self, item: ItemId) -> Result<u64, StoreError> {
        {
            let cells = self.cells.read().map_err(poisoned)?;
            if let Some(cell) = cells.get(&item) {
                return Ok(cell.bump());
            }
        }
        let mut cells = self.cells.write().map_err(poisoned)?;
        Ok(cells
            .entry(item)
            .or_insert_with(|| CounterCell::new(0))
            .bump())
    }

    fn get(&self, item: ItemId) -> Result<Option<u64>, StoreError> {
        let cells = self.cells.read().map_err(poisoned)?;
        Ok(cells
            .get(&item)
            .map(|cell| cell.absolute.load(Ordering::Acquire)))
    }

    fn get_many(&self, items: &[ItemId]) -> Result<Vec<Option<u64>>, StoreError> {
        let cells = self.cells.read().map_err(poisoned)?;
        Ok(items
            .iter()
            .map(|item| cells.get(item).map(|c| c.absolute.load(Ordering::Acquire)))
            .collect())
    }

    fn seed_if_absent(&self, item: ItemId, count: u64) -> Result<bool, StoreError> {
        let mut cells = self.cells.write().map_err(poisoned)?;
        if cells.contains_key(&item) {
            return Ok(false);
        }
        cells.insert(item, CounterCell::new(count));
        Ok(true)
    }

    fn pending_items(&self) -> Result<Vec<ItemId>, StoreError> {
        let cells = self.cells.read().map_err(poisoned)?;
        let mut items: Vec<ItemId> = cells
            .iter()
            .filter(|(_, cell)| cell.pending.load(Ordering::Acquire) != 0)
            .map(|(item, _)| *item)
            .collect();
        items.sort_unstable();
        Ok(items)
    }

    fn pending_delta(&self, item: ItemId) -> Result<i64, StoreError> {
        let cells = self.cells.read().map_err(poisoned)?;
        Ok(cells
            .get(&item)
            .map(|cell| cell.pending.load(Ordering::Acquire))
            .unwrap_or(0))
    }

    fn subtract_pending(&self, item: ItemId, delta: i64) -> Result<i64, StoreError> {
        let cells = self.cells.read().map_err(poisoned)?;
        Ok(cells
            .get(&item)
            .map(|cell| cell.pending.fetch_sub(delta, Ordering::AcqRel) - delta)
            .unwrap_or(0))
    }

    fn reset_pending(&self, item: ItemId) -> Result<(), StoreError> {
        let cells = self.cells.read().map_err(poisoned)?;
        if let Some(cell) = cells.get(&item) {
            cell.pending.store(0, Ordering::Release);
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryFastStore {
    async fn increment(&self, item: ItemId) -> Result<u64, StoreError> {
        self.counters.increment(item)
    }

    async fn get(&self, item: ItemId) -> Result<Option<u64>, StoreError> {
        self.counters.get(item)
    }

    async fn get_many(&self, items: &[ItemId]) -> Result<Vec<Option<u64>>, StoreError> {
        self.counters.get_many(items)
    }

    async fn seed_if_absent(&self, item: ItemId, count: u64) -> Result<bool, StoreError> {
        self.counters.seed_if_absent(item, count)
    }

    async fn pending_items(&self) -> Result<Vec<ItemId>, StoreError> {
        self.counters.pending_items()
    }

    async fn pending_delta(&self, item: ItemId) -> Result<i64, StoreError> {
        self.counters.pending_delta(item)
    }

    async fn subtract_pending(&self, item: ItemId, delta: i64) -> Result<i64, StoreError> {
        self.counters.subtract_pending(item, delta)
    }

    async fn reset_pending(&self, item: ItemId) -> Result<(), StoreError> {
        self.counters.reset_pending(item)
    }
}
