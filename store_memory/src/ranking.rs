//! Ranking table: a score map plus an ordered set for top-N scans.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use hotness_store::{RankingIndex, StoreError};
use hotness_types::{ItemId, RankingEntry};

use crate::MemoryFastStore;

#[derive(Default)]
struct RankingState {
    scores: HashMap<ItemId, u64>,
    /// Descending score, then ascending item id.
    order: BTreeSet<(Reverse<u64>, ItemId)>,
}

impl RankingState {
    fn set(&mut self, item: ItemId, score: u64) {
        if let Some(old) = self.scores.insert(item, score) {
            self.order.remove(&(Reverse(old), item));
        }
        self.order.insert((Reverse(score), item));
    }
}

pub(crate) struct RankingTable {
    state: Mutex<RankingState>,
}

impl RankingTable {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RankingState::default()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RankingState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("ranking lock poisoned".into()))
    }
}

#[async_trait]
impl RankingIndex for MemoryFastStore {
    async fn increment_score(&self, item: ItemId, by: u64) -> Result<u64, StoreError> {
        let mut state = self.ranking.lock()?;
        let score = state
            .scores
            .get(&item)
            .copied()
            .unwrap_or(0)
            .saturating_add(by);
        state.set(item, score);
        Ok(score)
    }

    async fn set_score(&self, item: ItemId, score: u64) -> Result<(), StoreError> {
        self.ranking.lock()?.set(item, score);
        Ok(())
    }

    async fn score(&self, item: ItemId) -> Result<Option<u64>, StoreError> {
        Ok(self.ranking.lock()?.scores.get(&item).copied())
    }

    async fn top(&self, n: usize) -> Result<Vec<RankingEntry>, StoreError> {
        let state = self.ranking.lock()?;
        Ok(state
            .order
            .iter()
            .take(n)
            .map(|(Reverse(score), item)| RankingEntry::new(*item, *score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn empty_index_returns_empty() {
        let store = MemoryFastStore::new();
        assert!(store.top(10).await.unwrap().is_empty());
        assert_eq!(store.score(id(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn increment_moves_item_up() {
        let store = MemoryFastStore::new();
        store.set_score(id(1), 5).await.unwrap();
        store.set_score(id(2), 3).await.unwrap();
        assert_eq!(store.top(1).await.unwrap()[0].item, id(1));

        assert_eq!(store.increment_score(id(2), 3).await.unwrap(), 6);
        let top = store.top(2).await.unwrap();
        assert_eq!(top[0], RankingEntry::new(id(2), 6));
        assert_eq!(top[1], RankingEntry::new(id(1), 5));
    }

    #[tokio::test]
    async fn ties_break_by_item_id() {
        let store = MemoryFastStore::new();
        for raw in [9, 4, 6] {
            store.set_score(id(raw), 10).await.unwrap();
        }
        let items: Vec<_> = store.top(3).await.unwrap().iter().map(|e| e.item).collect();
        assert_eq!(items, vec![id(4), id(6), id(9)]);
    }

    #[tokio::test]
    async fn overwriting_a_score_leaves_one_entry() {
        let store = MemoryFastStore::new();
        store.set_score(id(1), 5).await.unwrap();
        store.set_score(id(1), 2).await.unwrap();
        let top = store.top(10).await.unwrap();
        assert_eq!(top, vec![RankingEntry::new(id(1), 2)]);
    }

    proptest! {
        /// Distinct scores always come back strictly descending, truncated to
        /// `n`, and only ever contain inserted items.
        #[test]
        fn top_is_strictly_descending(
            scores in proptest::collection::hash_set(0u64..1_000_000, 1..64),
            n in 0usize..80,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let store = MemoryFastStore::new();
            let mut inserted = HashSet::new();
            rt.block_on(async {
                for (i, score) in scores.iter().enumerate() {
                    let item = id(i as u64 + 1);
                    inserted.insert(item);
                    store.set_score(item, *score).await.unwrap();
                }
            });
            let top = rt.block_on(store.top(n)).unwrap();
            prop_assert_eq!(top.len(), n.min(scores.len()));
            for pair in top.windows(2) {
                prop_assert!(pair[0].score > pair[1].score);
            }
            for entry in &top {
                prop_assert!(inserted.contains(&entry.item));
            }
        }
    }
}
