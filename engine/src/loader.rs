//! Startup loader: warms the fast store from the catalog once per process.
//!
//! Counters that already exist in the fast store are left alone: a cache that
//! survived a restart is fresher than the catalog, which only sees periodic
//! syncs. Their ranking score is raised to the counter if it fell behind.

use std::sync::Arc;

use hotness_store::CatalogStore;
use hotness_types::ItemId;
use tracing::Instrument;

use crate::fast_store::FastStore;
use crate::metrics::HotnessMetrics;
use crate::tracing_spans::load_span;

/// Outcome of a startup load. A partial load is still a successful start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Catalog rows read.
    pub catalog_rows: usize,
    /// Counters created from catalog values.
    pub seeded: usize,
    /// Counters already present in the fast store and left untouched.
    pub skipped_warm: usize,
    /// Rows that could not be seeded.
    pub failed: usize,
    /// Ranking scores that could not be seeded or repaired.
    pub ranking_failed: usize,
    /// Warm items whose score was raised to match their counter.
    pub scores_repaired: usize,
    /// The load stopped early because a store was unreachable.
    pub aborted: bool,
}

pub struct StartupLoader {
    fast: FastStore,
    catalog: Arc<dyn CatalogStore>,
    metrics: Arc<HotnessMetrics>,
}

impl StartupLoader {
    pub fn new(
        fast: FastStore,
        catalog: Arc<dyn CatalogStore>,
        metrics: Arc<HotnessMetrics>,
    ) -> Self {
        Self {
            fast,
            catalog,
            metrics,
        }
    }

    /// Seed every catalog counter the fast store does not already hold.
    ///
    /// Never fails: errors are logged and reflected in the report.
    pub async fn load_from_durable(&self) -> LoadReport {
        self.load().instrument(load_span()).await
    }

    async fn load(&self) -> LoadReport {
        let mut report = LoadReport::default();

        let rows = match self.catalog.read_all_counters() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("cannot read catalog counters, starting with a cold cache: {e}");
                report.aborted = true;
                return report;
            }
        };
        report.catalog_rows = rows.len();

        for (item, count) in rows {
            match self
                .fast
                .call(self.fast.counters.seed_if_absent(item, count))
                .await
            {
                Ok(false) => {
                    report.skipped_warm += 1;
                    self.repair_score(item, &mut report).await;
                }
                Ok(true) => {
                    report.seeded += 1;
                    if count > 0 {
                        if let Err(e) = self
                            .fast
                            .call(self.fast.ranking.set_score(item, count))
                            .await
                        {
                            tracing::warn!(%item, count, "cannot seed ranking score: {e}");
                            report.ranking_failed += 1;
                        }
                    }
                }
                Err(e) if e.is_transient() => {
                    // One timeout per remaining row would stall startup for
                    // nothing; the rest of the rows default to 0 on read.
                    tracing::error!(
                        %item,
                        remaining = report.catalog_rows - report.seeded - report.skipped_warm,
                        "fast store unreachable, abandoning startup load: {e}"
                    );
                    report.failed += 1;
                    report.aborted = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(%item, count, "cannot seed counter: {e}");
                    report.failed += 1;
                }
            }
        }

        self.metrics.load_items_seeded.inc_by(report.seeded as u64);
        tracing::info!(
            rows = report.catalog_rows,
            seeded = report.seeded,
            skipped_warm = report.skipped_warm,
            scores_repaired = report.scores_repaired,
            failed = report.failed,
            aborted = report.aborted,
            "startup load finished"
        );
        report
    }

    /// Scores track counters one increment at a time, so a ranking write lost
    /// after its counter increment leaves the score behind for good.
    async fn repair_score(&self, item: ItemId, report: &mut LoadReport) {
        let count = match self.fast.call(self.fast.counters.get(item)).await {
            Ok(Some(count)) if count > 0 => count,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(%item, "cannot read warm counter: {e}");
                report.ranking_failed += 1;
                return;
            }
        };
        let score = match self.fast.call(self.fast.ranking.score(item)).await {
            Ok(score) => score.unwrap_or(0),
            Err(e) => {
                tracing::warn!(%item, "cannot read ranking score: {e}");
                report.ranking_failed += 1;
                return;
            }
        };
        if score >= count {
            return;
        }
        match self.fast.call(self.fast.ranking.set_score(item, count)).await {
            Ok(()) => {
                tracing::debug!(%item, score, count, "raised lagging ranking score");
                report.scores_repaired += 1;
            }
            Err(e) => {
                tracing::warn!(%item, count, "cannot repair ranking score: {e}");
                report.ranking_failed += 1;
            }
        }
    }
}
