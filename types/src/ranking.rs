//! Entries of the popularity ranking.

use serde::{Deserialize, Serialize};

use crate::ItemId;

/// An item and its cumulative view score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankingEntry {
    pub item: ItemId,
    pub score: u64,
}

impl RankingEntry {
    pub fn new(item: ItemId, score: u64) -> Self {
        Self { item, score }
    }
}
