//! In-process fast store for the hotness engine.
//!
//! Implements [`CounterStore`](hotness_store::CounterStore),
//! [`RankingIndex`](hotness_store::RankingIndex) and
//! [`DedupGuard`](hotness_store::DedupGuard) on top of shared in-memory
//! structures. A single [`MemoryFastStore`] is shared (behind an `Arc`) by every
//! task in the process; each operation is atomic on its own, mirroring the
//! per-command atomicity of an external key-value server.

pub mod counters;
pub mod markers;
pub mod ranking;

use std::sync::Arc;

use hotness_types::{Clock, SystemClock};

use counters::CounterTable;
use markers::MarkerTable;
use ranking::RankingTable;

/// Counters, ranking and dedup markers in one process-wide store.
pub struct MemoryFastStore {
    counters: CounterTable,
    ranking: RankingTable,
    markers: MarkerTable,
}

impl MemoryFastStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Build a store whose dedup markers expire according to `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: CounterTable::new(),
            ranking: RankingTable::new(),
            markers: MarkerTable::new(clock),
        }
    }

    /// Number of items with a counter.
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    /// Number of live or not-yet-purged dedup markers.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

impl Default for MemoryFastStore {
    fn default() -> Self {
        Self::new()
    }
}
