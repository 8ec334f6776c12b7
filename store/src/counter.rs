//! Per-item view counters held in the fast store.

use async_trait::async_trait;
use hotness_types::ItemId;

use crate::StoreError;

/// Absolute view counts and not-yet-synced deltas, keyed by item.
///
/// Every method must be atomic with respect to concurrent callers on any
/// service instance sharing the store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Add one view: raises both the absolute count and the pending delta.
    /// Returns the new absolute count. Creates the counter if missing.
    async fn increment(&self, item: ItemId) -> Result<u64, StoreError>;

    /// Absolute count, or `None` if the store holds nothing for `item`.
    async fn get(&self, item: ItemId) -> Result<Option<u64>, StoreError>;

    /// Batched [`get`](CounterStore::get); the result is index-aligned with `items`.
    async fn get_many(&self, items: &[ItemId]) -> Result<Vec<Option<u64>>, StoreError>;

    /// Create the counter with `count` and a zero pending delta unless one
    /// already exists. Returns `true` if this call created it.
    async fn seed_if_absent(&self, item: ItemId, count: u64) -> Result<bool, StoreError>;

    /// Items whose pending delta is currently non-zero.
    async fn pending_items(&self) -> Result<Vec<ItemId>, StoreError>;

    /// Current pending delta for `item` (0 if none).
    async fn pending_delta(&self, item: ItemId) -> Result<i64, StoreError>;

    /// Atomically lower the pending delta by `delta`. Returns what remains,
    /// which is non-zero only if views arrived after the snapshot was taken.
    async fn subtract_pending(&self, item: ItemId, delta: i64) -> Result<i64, StoreError>;

    /// Set the pending delta to zero. The absolute count is untouched.
    async fn reset_pending(&self, item: ItemId) -> Result<(), StoreError>;
}
