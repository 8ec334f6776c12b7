//! Prometheus metrics for the hotness engine.
//!
//! The [`HotnessMetrics`] struct owns a dedicated [`Registry`] that an
//! embedding service can encode into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

/// Central collection of all engine-level Prometheus metrics.
pub struct HotnessMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Write path ──────────────────────────────────────────────────────
    /// Views counted in the fast store.
    pub views_counted: IntCounter,
    /// Views suppressed because the originator was inside the dedup window.
    pub views_deduplicated: IntCounter,
    /// Views written straight to the catalog while the fast store was down.
    pub views_degraded: IntCounter,
    /// Fast-store calls that failed or timed out.
    pub fast_store_errors: IntCounter,

    // ── Sync / load ─────────────────────────────────────────────────────
    pub sync_runs: IntCounter,
    /// Items whose delta was applied to the catalog.
    pub sync_items_flushed: IntCounter,
    /// Items whose delta stays pending after a failed catalog write.
    pub sync_items_failed: IntCounter,
    /// Items seeded into the fast store at startup.
    pub load_items_seeded: IntCounter,
    /// Wall time of a sync pass, in milliseconds.
    pub sync_duration_ms: Histogram,
}

impl HotnessMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let views_counted = register_int_counter_with_registry!(
            Opts::new("hotness_views_counted_total", "Views counted in the fast store"),
            registry
        )
        .expect("failed to register views_counted counter");

        let views_deduplicated = register_int_counter_with_registry!(
            Opts::new(
                "hotness_views_deduplicated_total",
                "Views suppressed by the dedup window"
            ),
            registry
        )
        .expect("failed to register views_deduplicated counter");

        let views_degraded = register_int_counter_with_registry!(
            Opts::new(
                "hotness_views_degraded_total",
                "Views written directly to the catalog during a fast-store outage"
            ),
            registry
        )
        .expect("failed to register views_degraded counter");

        let fast_store_errors = register_int_counter_with_registry!(
            Opts::new(
                "hotness_fast_store_errors_total",
                "Fast-store calls that failed or timed out"
            ),
            registry
        )
        .expect("failed to register fast_store_errors counter");

        let sync_runs = register_int_counter_with_registry!(
            Opts::new("hotness_sync_runs_total", "Sync passes started"),
            registry
        )
        .expect("failed to register sync_runs counter");

        let sync_items_flushed = register_int_counter_with_registry!(
            Opts::new(
                "hotness_sync_items_flushed_total",
                "Items whose pending delta was applied to the catalog"
            ),
            registry
        )
        .expect("failed to register sync_items_flushed counter");

        let sync_items_failed = register_int_counter_with_registry!(
            Opts::new(
                "hotness_sync_items_failed_total",
                "Items left pending after a failed catalog write"
            ),
            registry
        )
        .expect("failed to register sync_items_failed counter");

        let load_items_seeded = register_int_counter_with_registry!(
            Opts::new(
                "hotness_load_items_seeded_total",
                "Items seeded into the fast store at startup"
            ),
            registry
        )
        .expect("failed to register load_items_seeded counter");

        // 1 ms → ~16 s.
        let sync_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new("hotness_sync_duration_ms", "Sync pass duration in milliseconds")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register sync_duration_ms histogram");

        Self {
            registry,
            views_counted,
            views_deduplicated,
            views_degraded,
            fast_store_errors,
            sync_runs,
            sync_items_flushed,
            sync_items_failed,
            load_items_seeded,
            sync_duration_ms,
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::warn!("failed to encode metrics: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Default for HotnessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_text_contains_metric_names() {
        let metrics = HotnessMetrics::new();
        metrics.views_counted.inc();
        metrics.sync_duration_ms.observe(3.0);
        let text = metrics.encode_text();
        assert!(text.contains("hotness_views_counted_total 1"));
        assert!(text.contains("hotness_sync_duration_ms_bucket"));
    }
}
