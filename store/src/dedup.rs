//! Short-lived markers used to suppress duplicate view events.

use async_trait::async_trait;
use hotness_types::{ItemId, OriginatorId};
use std::time::Duration;

use crate::StoreError;

#[async_trait]
pub trait DedupGuard: Send + Sync {
    /// Create the (`item`, `originator`) marker with the given TTL unless an
    /// unexpired one exists. Returns `true` if this call created it, `false`
    /// if the pair was already marked inside the window.
    async fn mark_if_absent(
        &self,
        item: ItemId,
        originator: &OriginatorId,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Drop expired markers and return how many were removed.
    ///
    /// Backends that expire keys natively keep the default no-op.
    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}
