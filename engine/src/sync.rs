//! Sync scheduler: drains pending deltas from the fast store into the catalog.
//!
//! Each pass walks the items with a non-zero pending delta, applies each delta
//! to the catalog, and clears what was applied. A failed catalog write leaves
//! that item's delta pending for the next pass; nothing a pass hits is ever
//! raised to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hotness_store::CatalogStore;
use hotness_types::ItemId;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::config::DeltaClearMode;
use crate::fast_store::FastStore;
use crate::metrics::HotnessMetrics;
use crate::shutdown::ShutdownController;
use crate::tracing_spans::sync_run_span;

/// How a sync pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// Every pending item was visited.
    Completed,
    /// Shutdown was requested; the pass stopped between two items.
    Interrupted,
    /// Another pass was already in progress, so this one did nothing.
    AlreadyRunning,
    /// The pending item list could not be read from the fast store.
    FastStoreUnavailable,
}

/// Aggregate outcome of one sync pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub status: SyncStatus,
    /// Items whose delta was applied to the catalog.
    pub flushed: usize,
    /// Sum of the deltas applied.
    pub views_flushed: u64,
    /// Items the catalog no longer has; their delta was dropped.
    pub missing: usize,
    /// Items whose catalog write (or delta read) failed; still pending.
    pub failed: usize,
    /// Items with a non-positive delta that were simply cleared.
    pub cleared_empty: usize,
    /// Items applied to the catalog whose delta could not be cleared
    /// afterwards. They will be applied again on the next pass.
    pub uncleared: usize,
}

impl SyncReport {
    fn new(status: SyncStatus) -> Self {
        Self {
            status,
            flushed: 0,
            views_flushed: 0,
            missing: 0,
            failed: 0,
            cleared_empty: 0,
            uncleared: 0,
        }
    }
}

/// Resets the in-progress flag when a pass ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncScheduler {
    fast: FastStore,
    catalog: Arc<dyn CatalogStore>,
    metrics: Arc<HotnessMetrics>,
    shutdown: Arc<ShutdownController>,
    clear_mode: DeltaClearMode,
    running: AtomicBool,
}

impl SyncScheduler {
    pub fn new(
        fast: FastStore,
        catalog: Arc<dyn CatalogStore>,
        metrics: Arc<HotnessMetrics>,
        shutdown: Arc<ShutdownController>,
        clear_mode: DeltaClearMode,
    ) -> Self {
        Self {
            fast,
            catalog,
            metrics,
            shutdown,
            clear_mode,
            running: AtomicBool::new(false),
        }
    }

    /// Whether a pass is in progress right now.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// One sync pass. Stops between items once shutdown has been triggered.
    pub async fn sync_to_durable(&self) -> SyncReport {
        self.run(true).await
    }

    /// One sync pass that ignores shutdown; used for the final flush on stop.
    pub async fn flush_all(&self) -> SyncReport {
        self.run(false).await
    }

    async fn run(&self, interruptible: bool) -> SyncReport {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("sync pass already in progress, skipping");
            return SyncReport::new(SyncStatus::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let started = Instant::now();
        self.metrics.sync_runs.inc();
        let report = self.pass(interruptible).instrument(sync_run_span()).await;
        self.metrics
            .sync_duration_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        report
    }

    async fn pass(&self, interruptible: bool) -> SyncReport {
        let items = match self.fast.call(self.fast.counters.pending_items()).await {
            Ok(items) => items,
            Err(e) => {
                self.metrics.fast_store_errors.inc();
                tracing::warn!("cannot list pending deltas, skipping sync pass: {e}");
                return SyncReport::new(SyncStatus::FastStoreUnavailable);
            }
        };

        let mut report = SyncReport::new(SyncStatus::Completed);
        for item in items {
            if interruptible && self.shutdown.is_triggered() {
                report.status = SyncStatus::Interrupted;
                break;
            }
            self.flush_item(item, &mut report).await;
        }

        self.metrics.sync_items_flushed.inc_by(report.flushed as u64);
        self.metrics.sync_items_failed.inc_by(report.failed as u64);
        if report.failed > 0 || report.uncleared > 0 {
            tracing::warn!(
                flushed = report.flushed,
                views = report.views_flushed,
                missing = report.missing,
                failed = report.failed,
                uncleared = report.uncleared,
                status = ?report.status,
                "sync pass finished with failures"
            );
        } else {
            tracing::info!(
                flushed = report.flushed,
                views = report.views_flushed,
                missing = report.missing,
                status = ?report.status,
                "sync pass finished"
            );
        }
        report
    }

    async fn flush_item(&self, item: ItemId, report: &mut SyncReport) {
        let delta = match self.fast.call(self.fast.counters.pending_delta(item)).await {
            Ok(delta) => delta,
            Err(e) => {
                self.metrics.fast_store_errors.inc();
                tracing::warn!(%item, "cannot read pending delta: {e}");
                report.failed += 1;
                return;
            }
        };

        if delta <= 0 {
            if let Err(e) = self.fast.call(self.fast.counters.reset_pending(item)).await {
                tracing::warn!(%item, delta, "cannot clear non-positive delta: {e}");
            }
            report.cleared_empty += 1;
            return;
        }

        match self.catalog.apply_delta(item, delta as u64) {
            Ok(0) => {
                tracing::warn!(%item, delta, "item missing from catalog, dropping its delta");
                report.missing += 1;
                self.clear(item, delta, report).await;
            }
            Ok(_) => {
                tracing::debug!(%item, delta, "applied delta to catalog");
                report.flushed += 1;
                report.views_flushed += delta as u64;
                self.clear(item, delta, report).await;
            }
            Err(e) => {
                tracing::warn!(%item, delta, "catalog write failed, will retry next pass: {e}");
                report.failed += 1;
            }
        }
    }

    async fn clear(&self, item: ItemId, delta: i64, report: &mut SyncReport) {
        let cleared = match self.clear_mode {
            DeltaClearMode::Subtract => self
                .fast
                .call(self.fast.counters.subtract_pending(item, delta))
                .await
                .map(|remaining| {
                    if remaining > 0 {
                        tracing::trace!(%item, remaining, "views arrived during sync");
                    }
                }),
            DeltaClearMode::Reset => {
                self.fast
                    .call(self.fast.counters.reset_pending(item))
                    .await
            }
        };
        if let Err(e) = cleared {
            self.metrics.fast_store_errors.inc();
            tracing::error!(%item, delta, "delta applied but not cleared, it will be applied again: {e}");
            report.uncleared += 1;
        }
    }

    /// Run [`sync_to_durable`](Self::sync_to_durable) every `period` until
    /// shutdown. Ticks missed while a pass runs long are skipped, not queued.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        let mut shutdown_rx = self.shutdown.subscribe();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("sync scheduler shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.sync_to_durable().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotness_nullables::{FlakyFastStore, NullCatalogStore, NullClock};
    use hotness_store::CounterStore;

    struct Harness {
        fast: Arc<FlakyFastStore>,
        catalog: Arc<NullCatalogStore>,
        shutdown: Arc<ShutdownController>,
        scheduler: Arc<SyncScheduler>,
    }

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    fn harness(mode: DeltaClearMode) -> Harness {
        let fast = Arc::new(FlakyFastStore::new(Arc::new(NullClock::default())));
        let catalog = Arc::new(NullCatalogStore::new());
        let shutdown = Arc::new(ShutdownController::new());
        let scheduler = Arc::new(SyncScheduler::new(
            FastStore::shared(fast.clone(), Duration::from_millis(200)),
            catalog.clone(),
            Arc::new(HotnessMetrics::new()),
            shutdown.clone(),
            mode,
        ));
        Harness {
            fast,
            catalog,
            shutdown,
            scheduler,
        }
    }

    async fn views(h: &Harness, item: ItemId, n: usize) {
        for _ in 0..n {
            h.fast.inner().increment(item).await.unwrap();
        }
    }

    #[tokio::test]
    async fn pending_delta_lands_in_catalog() {
        let h = harness(DeltaClearMode::Subtract);
        h.catalog.insert_item(id(1), 10);
        views(&h, id(1), 4).await;

        let report = h.scheduler.sync_to_durable().await;
        assert_eq!(report.status, SyncStatus::Completed);
        assert_eq!(report.flushed, 1);
        assert_eq!(report.views_flushed, 4);
        assert_eq!(h.catalog.counter(id(1)), Some(14));
        assert_eq!(h.fast.inner().pending_delta(id(1)).await.unwrap(), 0);
        // The absolute count is untouched.
        assert_eq!(h.fast.inner().get(id(1)).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn second_pass_applies_nothing_new() {
        let h = harness(DeltaClearMode::Subtract);
        h.catalog.insert_item(id(1), 0);
        views(&h, id(1), 2).await;
        h.scheduler.sync_to_durable().await;
        let report = h.scheduler.sync_to_durable().await;
        assert_eq!(report.flushed, 0);
        assert_eq!(h.catalog.counter(id(1)), Some(2));
    }

    #[tokio::test]
    async fn one_failing_item_does_not_abort_the_batch() {
        let h = harness(DeltaClearMode::Subtract);
        for raw in 1..=3 {
            h.catalog.insert_item(id(raw), 0);
            views(&h, id(raw), raw as usize).await;
        }
        h.catalog.fail_item(id(2));

        let report = h.scheduler.sync_to_durable().await;
        assert_eq!(report.flushed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(h.catalog.counter(id(1)), Some(1));
        assert_eq!(h.catalog.counter(id(3)), Some(3));
        assert_eq!(h.fast.inner().pending_delta(id(2)).await.unwrap(), 2);

        h.catalog.heal_item(id(2));
        let retry = h.scheduler.sync_to_durable().await;
        assert_eq!(retry.flushed, 1);
        assert_eq!(h.catalog.counter(id(2)), Some(2));
        assert_eq!(h.fast.inner().pending_delta(id(2)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_catalog_row_drops_delta() {
        let h = harness(DeltaClearMode::Subtract);
        views(&h, id(8), 3).await;
        let report = h.scheduler.sync_to_durable().await;
        assert_eq!(report.missing, 1);
        assert_eq!(h.fast.inner().pending_delta(id(8)).await.unwrap(), 0);
        assert!(h.fast.inner().pending_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn negative_delta_is_cleared_without_catalog_write() {
        let h = harness(DeltaClearMode::Subtract);
        h.catalog.insert_item(id(4), 0);
        views(&h, id(4), 1).await;
        h.fast.inner().subtract_pending(id(4), 3).await.unwrap();

        let report = h.scheduler.sync_to_durable().await;
        assert_eq!(report.cleared_empty, 1);
        assert_eq!(h.catalog.apply_calls(), 0);
        assert_eq!(h.fast.inner().pending_delta(id(4)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fast_store_outage_skips_the_pass() {
        let h = harness(DeltaClearMode::Subtract);
        h.catalog.insert_item(id(1), 0);
        views(&h, id(1), 2).await;
        h.fast.set_offline(true);

        let report = h.scheduler.sync_to_durable().await;
        assert_eq!(report.status, SyncStatus::FastStoreUnavailable);
        assert_eq!(h.catalog.counter(id(1)), Some(0));

        h.fast.set_offline(false);
        assert_eq!(h.scheduler.sync_to_durable().await.flushed, 1);
    }

    #[tokio::test]
    async fn reset_mode_zeroes_delta() {
        let h = harness(DeltaClearMode::Reset);
        h.catalog.insert_item(id(1), 0);
        views(&h, id(1), 5).await;
        let report = h.scheduler.sync_to_durable().await;
        assert_eq!(report.views_flushed, 5);
        assert_eq!(h.fast.inner().pending_delta(id(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn shutdown_interrupts_between_items() {
        let h = harness(DeltaClearMode::Subtract);
        h.catalog.insert_item(id(1), 0);
        views(&h, id(1), 1).await;
        h.shutdown.shutdown();

        let report = h.scheduler.sync_to_durable().await;
        assert_eq!(report.status, SyncStatus::Interrupted);
        assert_eq!(report.flushed, 0);

        let final_flush = h.scheduler.flush_all().await;
        assert_eq!(final_flush.status, SyncStatus::Completed);
        assert_eq!(h.catalog.counter(id(1)), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_pass_is_skipped() {
        let h = harness(DeltaClearMode::Subtract);
        h.catalog.insert_item(id(1), 0);
        views(&h, id(1), 1).await;
        h.fast.set_latency(Duration::from_millis(50));

        let first = {
            let scheduler = h.scheduler.clone();
            tokio::spawn(async move { scheduler.sync_to_durable().await })
        };
        tokio::task::yield_now().await;
        assert!(h.scheduler.is_running());
        let second = h.scheduler.sync_to_durable().await;
        assert_eq!(second.status, SyncStatus::AlreadyRunning);

        let first = first.await.unwrap();
        assert_eq!(first.status, SyncStatus::Completed);
        assert!(!h.scheduler.is_running());
        assert_eq!(h.catalog.counter(id(1)), Some(1));
    }

    /// Runs one pass with 50ms per fast-store call and lands a view at 120ms,
    /// after the delta read (50..100ms) and before the clear (100..150ms).
    async fn pass_with_late_view(h: &Harness) -> SyncReport {
        h.catalog.insert_item(id(1), 0);
        views(h, id(1), 2).await;
        h.fast.set_latency(Duration::from_millis(50));

        let pass = {
            let scheduler = h.scheduler.clone();
            tokio::spawn(async move { scheduler.sync_to_durable().await })
        };
        tokio::time::sleep(Duration::from_millis(120)).await;
        h.fast.inner().increment(id(1)).await.unwrap();
        let report = pass.await.unwrap();
        h.fast.set_latency(Duration::ZERO);
        report
    }

    #[tokio::test(start_paused = true)]
    async fn subtract_keeps_view_arriving_mid_pass() {
        let h = harness(DeltaClearMode::Subtract);
        let report = pass_with_late_view(&h).await;

        assert_eq!(report.status, SyncStatus::Completed);
        assert_eq!(report.views_flushed, 2);
        assert_eq!(h.catalog.applied(), vec![(id(1), 2)]);
        assert_eq!(h.fast.inner().pending_delta(id(1)).await.unwrap(), 1);

        let next = h.scheduler.sync_to_durable().await;
        assert_eq!(next.views_flushed, 1);
        assert_eq!(h.catalog.counter(id(1)), Some(3));
        assert_eq!(h.fast.inner().get(id(1)).await.unwrap(), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_drops_view_arriving_mid_pass() {
        let h = harness(DeltaClearMode::Reset);
        let report = pass_with_late_view(&h).await;

        assert_eq!(report.views_flushed, 2);
        assert_eq!(h.fast.inner().pending_delta(id(1)).await.unwrap(), 0);
        assert_eq!(h.catalog.counter(id(1)), Some(2));
        // The fast store counted three views; the catalog will only ever see two.
        assert_eq!(h.fast.inner().get(id(1)).await.unwrap(), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_scheduler_runs_on_period_and_stops() {
        let h = harness(DeltaClearMode::Subtract);
        h.catalog.insert_item(id(1), 0);
        views(&h, id(1), 3).await;

        let handle = h.scheduler.clone().spawn(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(h.catalog.counter(id(1)), Some(3));

        h.shutdown.shutdown();
        handle.await.unwrap();
    }
}
