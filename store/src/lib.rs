//! Abstract storage traits for the hotness engine.
//!
//! Two kinds of store are involved:
//! - the **fast store** (counters, ranking index, dedup markers), shared by every
//!   service instance and accessed asynchronously under a short timeout;
//! - the **catalog store**, the durable store of record for baseline counters.
//!
//! Every backend (in-memory, LMDB, test doubles) implements these traits. The
//! engine depends only on the traits.

pub mod catalog;
pub mod counter;
pub mod dedup;
pub mod error;
pub mod ranking;

pub use catalog::CatalogStore;
pub use counter::CounterStore;
pub use dedup::DedupGuard;
pub use error::StoreError;
pub use ranking::RankingIndex;
