//! Pre-built [`tracing::Span`] constructors for engine operations.
//!
//! Consistent span names and field sets make it easy to filter and correlate
//! traces across service instances.

use hotness_types::ItemId;
use tracing::{info_span, Span};

/// Span covering one `increment_view` call.
pub fn increment_span(item: ItemId) -> Span {
    info_span!("increment_view", item = %item)
}

/// Span covering one pass of the sync scheduler.
pub fn sync_run_span() -> Span {
    info_span!("sync_run")
}

/// Span covering the startup load from the catalog.
pub fn load_span() -> Span {
    info_span!("startup_load")
}

/// Span covering one expired-marker sweep.
pub fn sweep_span() -> Span {
    info_span!("dedup_sweep")
}
