//! Hotness service: the single entry point for recording and querying views.
//!
//! Normal operation touches only the fast store. When the fast store is
//! unreachable (error or timeout) writes go straight to the catalog and reads
//! fall back to the catalog's baseline counters; callers always get a value.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hotness_store::{CatalogStore, StoreError};
use hotness_types::{ItemId, OriginatorId, RankingEntry, ViewOutcome};
use tracing::Instrument;

use crate::config::HotnessConfig;
use crate::fast_store::FastStore;
use crate::metrics::HotnessMetrics;
use crate::tracing_spans::increment_span;
use crate::HotnessError;

pub struct HotnessService {
    fast: FastStore,
    catalog: Arc<dyn CatalogStore>,
    metrics: Arc<HotnessMetrics>,
    dedup_window: Duration,
    ranking_page_size: usize,
}

impl HotnessService {
    pub fn new(
        config: &HotnessConfig,
        fast: FastStore,
        catalog: Arc<dyn CatalogStore>,
        metrics: Arc<HotnessMetrics>,
    ) -> Self {
        Self {
            fast,
            catalog,
            metrics,
            dedup_window: config.dedup_window(),
            ranking_page_size: config.ranking_page_size,
        }
    }

    /// Record one view of `item`.
    ///
    /// With an originator, a repeat inside the dedup window is not counted and
    /// the current count is returned as [`ViewOutcome::Deduplicated`]. If the
    /// fast store is down the view is applied to the catalog and
    /// [`ViewOutcome::Degraded`] is returned. Errors only when the catalog
    /// rejects that degraded write too.
    pub async fn increment_view(
        &self,
        item: ItemId,
        originator: Option<&OriginatorId>,
    ) -> Result<ViewOutcome, HotnessError> {
        self.record_view(item, originator)
            .instrument(increment_span(item))
            .await
    }

    async fn record_view(
        &self,
        item: ItemId,
        originator: Option<&OriginatorId>,
    ) -> Result<ViewOutcome, HotnessError> {
        if let Some(originator) = originator {
            let marked = self
                .fast
                .call(
                    self.fast
                        .dedup
                        .mark_if_absent(item, originator, self.dedup_window),
                )
                .await;
            match marked {
                Ok(true) => {}
                Ok(false) => {
                    self.metrics.views_deduplicated.inc();
                    tracing::debug!(%originator, "view suppressed by dedup window");
                    return Ok(ViewOutcome::Deduplicated(self.get_view_count(item).await));
                }
                Err(e) => return self.degraded_increment(item, e),
            }
        }

        let count = match self.fast.call(self.fast.counters.increment(item)).await {
            Ok(count) => count,
            Err(e) => return self.degraded_increment(item, e),
        };

        // Ranking is derived; a miss leaves the score behind the counter until
        // the next startup load raises it.
        if let Err(e) = self
            .fast
            .call(self.fast.ranking.increment_score(item, 1))
            .await
        {
            self.metrics.fast_store_errors.inc();
            tracing::warn!("ranking update failed, score will lag the counter: {e}");
        }

        self.metrics.views_counted.inc();
        Ok(ViewOutcome::Counted(count))
    }

    fn degraded_increment(
        &self,
        item: ItemId,
        cause: StoreError,
    ) -> Result<ViewOutcome, HotnessError> {
        self.metrics.fast_store_errors.inc();
        tracing::warn!("fast store unavailable, writing view to catalog: {cause}");
        match self.catalog.apply_delta(item, 1) {
            Ok(0) => Err(HotnessError::UnknownItem(item)),
            Ok(_) => {
                self.metrics.views_degraded.inc();
                Ok(ViewOutcome::Degraded)
            }
            Err(e) => {
                tracing::error!("degraded write to catalog failed, view lost: {e}");
                Err(HotnessError::Unavailable(format!(
                    "fast store: {cause}; catalog: {e}"
                )))
            }
        }
    }

    /// Absolute view count for `item`; 0 if the item has no counter.
    ///
    /// Falls back to the catalog's baseline while the fast store is down, and
    /// to 0 if that fails as well.
    pub async fn get_view_count(&self, item: ItemId) -> u64 {
        match self.fast.call(self.fast.counters.get(item)).await {
            Ok(count) => count.unwrap_or(0),
            Err(e) => {
                self.metrics.fast_store_errors.inc();
                tracing::warn!(%item, "fast store read failed, using catalog baseline: {e}");
                self.catalog_count(item)
            }
        }
    }

    /// Batched [`get_view_count`](Self::get_view_count). Every requested item
    /// appears in the result. One fast-store round trip.
    pub async fn get_view_counts(&self, items: &[ItemId]) -> HashMap<ItemId, u64> {
        if items.is_empty() {
            return HashMap::new();
        }
        match self.fast.call(self.fast.counters.get_many(items)).await {
            Ok(counts) => items
                .iter()
                .zip(counts)
                .map(|(item, count)| (*item, count.unwrap_or(0)))
                .collect(),
            Err(e) => {
                self.metrics.fast_store_errors.inc();
                tracing::warn!(
                    items = items.len(),
                    "fast store batch read failed, using catalog baselines: {e}"
                );
                items
                    .iter()
                    .map(|item| (*item, self.catalog_count(*item)))
                    .collect()
            }
        }
    }

    /// Up to `top_n` item ids by descending view score. Zero asks for the
    /// configured page size. Empty when the index is empty or unreachable.
    pub async fn get_hot_ranking(&self, top_n: usize) -> Vec<ItemId> {
        self.get_hot_entries(top_n)
            .await
            .into_iter()
            .map(|entry| entry.item)
            .collect()
    }

    /// Like [`get_hot_ranking`](Self::get_hot_ranking) but with scores.
    pub async fn get_hot_entries(&self, top_n: usize) -> Vec<RankingEntry> {
        let n = if top_n == 0 {
            self.ranking_page_size
        } else {
            top_n
        };
        match self.fast.call(self.fast.ranking.top(n)).await {
            Ok(entries) => entries,
            Err(e) => {
                self.metrics.fast_store_errors.inc();
                tracing::warn!("ranking unavailable, returning empty list: {e}");
                Vec::new()
            }
        }
    }

    fn catalog_count(&self, item: ItemId) -> u64 {
        match self.catalog.read_counter(item) {
            Ok(count) => count.unwrap_or(0),
            Err(e) => {
                tracing::warn!(%item, "catalog read failed, reporting 0: {e}");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotness_nullables::{FlakyFastStore, NullCatalogStore, NullClock};
    use hotness_store::{CounterStore, RankingIndex};

    struct Harness {
        clock: Arc<NullClock>,
        fast: Arc<FlakyFastStore>,
        catalog: Arc<NullCatalogStore>,
        metrics: Arc<HotnessMetrics>,
        service: HotnessService,
    }

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    fn sess(name: &str) -> OriginatorId {
        OriginatorId::new(name).unwrap()
    }

    fn harness() -> Harness {
        harness_with(HotnessConfig::default())
    }

    fn harness_with(config: HotnessConfig) -> Harness {
        let clock = Arc::new(NullClock::new(1_000_000));
        let fast = Arc::new(FlakyFastStore::new(clock.clone()));
        let catalog = Arc::new(NullCatalogStore::new());
        let metrics = Arc::new(HotnessMetrics::new());
        let service = HotnessService::new(
            &config,
            FastStore::shared(fast.clone(), config.fast_store_timeout()),
            catalog.clone(),
            metrics.clone(),
        );
        Harness {
            clock,
            fast,
            catalog,
            metrics,
            service,
        }
    }

    #[tokio::test]
    async fn increments_without_originator_always_count() {
        let h = harness();
        for expected in 1..=5 {
            let outcome = h.service.increment_view(id(1), None).await.unwrap();
            assert_eq!(outcome, ViewOutcome::Counted(expected));
        }
        assert_eq!(h.service.get_view_count(id(1)).await, 5);
        assert_eq!(h.metrics.views_counted.get(), 5);
    }

    #[tokio::test]
    async fn increment_raises_ranking_score_in_step() {
        let h = harness();
        h.fast.inner().seed_if_absent(id(3), 10).await.unwrap();
        h.fast.inner().set_score(id(3), 10).await.unwrap();

        for _ in 0..4 {
            h.service.increment_view(id(3), None).await.unwrap();
        }
        assert_eq!(h.fast.inner().score(id(3)).await.unwrap(), Some(14));
        assert_eq!(h.service.get_view_count(id(3)).await, 14);
    }

    #[tokio::test]
    async fn duplicate_inside_window_returns_current_count() {
        let h = harness();
        let s1 = sess("sess-1");
        assert_eq!(
            h.service.increment_view(id(42), Some(&s1)).await.unwrap(),
            ViewOutcome::Counted(1)
        );
        h.clock.advance(Duration::from_millis(400));
        assert_eq!(
            h.service.increment_view(id(42), Some(&s1)).await.unwrap(),
            ViewOutcome::Deduplicated(1)
        );
        assert_eq!(h.metrics.views_deduplicated.get(), 1);
    }

    #[tokio::test]
    async fn view_after_window_counts_again() {
        let h = harness();
        let s1 = sess("sess-1");
        h.service.increment_view(id(42), Some(&s1)).await.unwrap();
        h.service.increment_view(id(42), Some(&s1)).await.unwrap();
        h.clock.advance(Duration::from_secs(1));
        assert_eq!(
            h.service.increment_view(id(42), Some(&s1)).await.unwrap(),
            ViewOutcome::Counted(2)
        );
    }

    #[tokio::test]
    async fn outage_writes_through_to_catalog() {
        let h = harness();
        h.catalog.insert_item(id(5), 100);
        h.fast.set_offline(true);

        let outcome = h.service.increment_view(id(5), Some(&sess("s"))).await.unwrap();
        assert_eq!(outcome, ViewOutcome::Degraded);
        assert_eq!(outcome.count(), None);
        assert_eq!(h.catalog.counter(id(5)), Some(101));
        assert_eq!(h.metrics.views_degraded.get(), 1);

        // Ranking is not touched on the degraded path.
        h.fast.set_offline(false);
        assert_eq!(h.fast.inner().score(id(5)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn outage_with_unknown_item_reports_it() {
        let h = harness();
        h.fast.set_offline(true);
        let err = h.service.increment_view(id(9), None).await.unwrap_err();
        assert!(matches!(err, HotnessError::UnknownItem(item) if item == id(9)));
    }

    #[tokio::test]
    async fn both_stores_down_is_an_error() {
        let h = harness();
        h.catalog.insert_item(id(5), 0);
        h.fast.set_offline(true);
        h.catalog.set_offline(true);
        let err = h.service.increment_view(id(5), None).await.unwrap_err();
        assert!(matches!(err, HotnessError::Unavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fast_store_counts_as_outage() {
        let h = harness();
        h.catalog.insert_item(id(5), 7);
        h.fast.set_latency(Duration::from_secs(2));

        let outcome = h.service.increment_view(id(5), None).await.unwrap();
        assert_eq!(outcome, ViewOutcome::Degraded);
        assert_eq!(h.catalog.counter(id(5)), Some(8));
        assert_eq!(h.service.get_view_count(id(5)).await, 8);
    }

    #[tokio::test]
    async fn missing_counter_reads_zero() {
        let h = harness();
        assert_eq!(h.service.get_view_count(id(77)).await, 0);
    }

    #[tokio::test]
    async fn read_falls_back_to_catalog_then_zero() {
        let h = harness();
        h.catalog.insert_item(id(2), 30);
        h.fast.set_offline(true);
        assert_eq!(h.service.get_view_count(id(2)).await, 30);
        h.catalog.set_offline(true);
        assert_eq!(h.service.get_view_count(id(2)).await, 0);
    }

    #[tokio::test]
    async fn batch_read_covers_every_id_in_one_call() {
        let h = harness();
        h.service.increment_view(id(1), None).await.unwrap();
        h.service.increment_view(id(1), None).await.unwrap();
        h.service.increment_view(id(3), None).await.unwrap();

        let counts = h.service.get_view_counts(&[id(1), id(2), id(3)]).await;
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&id(1)], 2);
        assert_eq!(counts[&id(2)], 0);
        assert_eq!(counts[&id(3)], 1);
        assert_eq!(h.fast.batch_reads(), 1);
    }

    #[tokio::test]
    async fn empty_batch_skips_the_store() {
        let h = harness();
        assert!(h.service.get_view_counts(&[]).await.is_empty());
        assert_eq!(h.fast.batch_reads(), 0);
    }

    #[tokio::test]
    async fn batch_read_falls_back_per_item() {
        let h = harness();
        h.catalog.insert_item(id(1), 4);
        h.fast.set_offline(true);
        let counts = h.service.get_view_counts(&[id(1), id(2)]).await;
        assert_eq!(counts[&id(1)], 4);
        assert_eq!(counts[&id(2)], 0);
    }

    #[tokio::test]
    async fn ranking_orders_by_views() {
        let h = harness();
        for (raw, views) in [(1, 2), (2, 5), (3, 1)] {
            for _ in 0..views {
                h.service.increment_view(id(raw), None).await.unwrap();
            }
        }
        assert_eq!(h.service.get_hot_ranking(2).await, vec![id(2), id(1)]);
        assert_eq!(
            h.service.get_hot_ranking(10).await,
            vec![id(2), id(1), id(3)]
        );
    }

    #[tokio::test]
    async fn zero_top_n_uses_page_size() {
        let h = harness_with(HotnessConfig {
            ranking_page_size: 2,
            ..Default::default()
        });
        for raw in 1..=5 {
            h.service.increment_view(id(raw), None).await.unwrap();
        }
        assert_eq!(h.service.get_hot_ranking(0).await.len(), 2);
    }

    #[tokio::test]
    async fn ranking_is_empty_not_error() {
        let h = harness();
        assert!(h.service.get_hot_ranking(10).await.is_empty());
        h.fast.set_offline(true);
        assert!(h.service.get_hot_ranking(10).await.is_empty());
    }
}
