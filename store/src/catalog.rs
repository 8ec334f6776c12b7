//! Durable catalog store trait.

use hotness_types::ItemId;

use crate::StoreError;

/// The durable store of record for per-item baseline view counters.
///
/// Only updated periodically by the sync scheduler, or directly while the fast
/// store is unreachable.
pub trait CatalogStore: Send + Sync {
    /// Baseline counter for `item`, or `None` if the catalog has no such item.
    fn read_counter(&self, item: ItemId) -> Result<Option<u64>, StoreError>;

    /// Add `delta` to `item`'s counter. Returns the number of rows affected:
    /// 0 means the item no longer exists in the catalog.
    fn apply_delta(&self, item: ItemId, delta: u64) -> Result<u64, StoreError>;

    /// Every (item, counter) pair in the catalog.
    fn read_all_counters(&self) -> Result<Vec<(ItemId, u64)>, StoreError>;
}
