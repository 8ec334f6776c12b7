//! Sorted popularity index held in the fast store.

use async_trait::async_trait;
use hotness_types::{ItemId, RankingEntry};

use crate::StoreError;

/// Items ordered by cumulative view score.
#[async_trait]
pub trait RankingIndex: Send + Sync {
    /// Atomically raise `item`'s score by `by`, inserting it if absent.
    /// Returns the new score.
    async fn increment_score(&self, item: ItemId, by: u64) -> Result<u64, StoreError>;

    /// Overwrite `item`'s score.
    async fn set_score(&self, item: ItemId, score: u64) -> Result<(), StoreError>;

    async fn score(&self, item: ItemId) -> Result<Option<u64>, StoreError>;

    /// Up to `n` entries by descending score. Ties are ordered by ascending
    /// item id so repeated calls agree.
    async fn top(&self, n: usize) -> Result<Vec<RankingEntry>, StoreError>;
}
