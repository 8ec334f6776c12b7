//! Engine orchestrator: wires the service, loader and background tasks.
//!
//! Lifecycle:
//! 1. [`HotnessEngine::new`] validates the config and builds every component.
//! 2. [`HotnessEngine::start`] runs the startup load, then spawns the sync
//!    scheduler and the dedup marker sweeper.
//! 3. [`HotnessEngine::stop`] signals shutdown, waits for the tasks, and runs
//!    a final uninterruptible sync so no pending delta is left behind.

use std::sync::Arc;
use std::time::Duration;

use hotness_store::CatalogStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::config::HotnessConfig;
use crate::fast_store::FastStore;
use crate::loader::{LoadReport, StartupLoader};
use crate::metrics::HotnessMetrics;
use crate::service::HotnessService;
use crate::shutdown::ShutdownController;
use crate::sync::{SyncReport, SyncScheduler};
use crate::tracing_spans::sweep_span;
use crate::HotnessError;

const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HotnessEngine {
    config: HotnessConfig,
    fast: FastStore,
    service: Arc<HotnessService>,
    loader: StartupLoader,
    scheduler: Arc<SyncScheduler>,
    metrics: Arc<HotnessMetrics>,
    shutdown: Arc<ShutdownController>,
    task_handles: Vec<JoinHandle<()>>,
    started: bool,
    stopped: bool,
}

impl HotnessEngine {
    /// Build an engine over the given stores. The fast store's call deadline
    /// is taken from `config`, overriding whatever `fast` carried.
    pub fn new(
        config: HotnessConfig,
        fast: FastStore,
        catalog: Arc<dyn CatalogStore>,
    ) -> Result<Self, HotnessError> {
        config.validate()?;

        let fast = FastStore::new(
            fast.counters,
            fast.ranking,
            fast.dedup,
            config.fast_store_timeout(),
        );
        let metrics = Arc::new(HotnessMetrics::new());
        let shutdown = Arc::new(ShutdownController::new());

        let service = Arc::new(HotnessService::new(
            &config,
            fast.clone(),
            Arc::clone(&catalog),
            Arc::clone(&metrics),
        ));
        let loader = StartupLoader::new(fast.clone(), Arc::clone(&catalog), Arc::clone(&metrics));
        let scheduler = Arc::new(SyncScheduler::new(
            fast.clone(),
            catalog,
            Arc::clone(&metrics),
            Arc::clone(&shutdown),
            config.delta_clear_mode,
        ));

        Ok(Self {
            config,
            fast,
            service,
            loader,
            scheduler,
            metrics,
            shutdown,
            task_handles: Vec::new(),
            started: false,
            stopped: false,
        })
    }

    /// Warm the fast store, then start the background tasks.
    ///
    /// Call once, before handing out the service. A stopped engine cannot be
    /// started again: its shutdown signal has already fired.
    pub async fn start(&mut self) -> Result<LoadReport, HotnessError> {
        if self.stopped {
            return Err(HotnessError::Stopped);
        }
        if self.started {
            return Err(HotnessError::Config("engine already started".into()));
        }
        let report = self.loader.load_from_durable().await;

        let sync_handle = Arc::clone(&self.scheduler).spawn(self.config.sync_interval());
        self.task_handles.push(sync_handle);
        self.task_handles.push(self.spawn_sweeper());
        self.started = true;

        tracing::info!(
            sync_interval_ms = self.config.sync_interval_ms,
            dedup_window_secs = self.config.dedup_window_secs,
            fast_store_timeout_ms = self.config.fast_store_timeout_ms,
            "hotness engine started"
        );
        Ok(report)
    }

    // ── Dedup marker sweep ──────────────────────────────────────────────
    fn spawn_sweeper(&self) -> JoinHandle<()> {
        let fast = self.fast.clone();
        let metrics = Arc::clone(&self.metrics);
        let period = self.config.dedup_sweep_interval();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("dedup sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match fast.call(fast.dedup.purge_expired()).instrument(sweep_span()).await {
                            Ok(removed) if removed > 0 => {
                                tracing::debug!(removed, "swept expired dedup markers");
                            }
                            Ok(_) => {}
                            Err(e) => {
                                metrics.fast_store_errors.inc();
                                tracing::warn!("dedup sweep failed: {e}");
                            }
                        }
                    }
                }
            }
        })
    }

    /// Signal shutdown, wait for background tasks, then flush every pending
    /// delta one last time.
    pub async fn stop(&mut self) -> Result<SyncReport, HotnessError> {
        if !self.started {
            return Err(HotnessError::NotStarted);
        }
        self.shutdown.shutdown();
        self.stopped = true;

        let handles = std::mem::take(&mut self.task_handles);
        let joined = tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, async {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!("background task ended abnormally: {e}");
                }
            }
        })
        .await;
        self.started = false;
        if joined.is_err() {
            return Err(HotnessError::ShutdownTimeout);
        }

        let report = self.scheduler.flush_all().await;
        tracing::info!(flushed = report.flushed, "hotness engine stopped");
        Ok(report)
    }

    pub fn service(&self) -> Arc<HotnessService> {
        Arc::clone(&self.service)
    }

    pub fn scheduler(&self) -> Arc<SyncScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn metrics(&self) -> Arc<HotnessMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    pub fn config(&self) -> &HotnessConfig {
        &self.config
    }
}
