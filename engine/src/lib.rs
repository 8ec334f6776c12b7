//! Hotness engine: real-time view counters, a "most popular" ranking, and
//! periodic reconciliation into a durable catalog.
//!
//! The engine is a library embedded in a larger service:
//! - Records views with per-originator dedup ([`HotnessService`])
//! - Serves counts and the top-N ranking from the shared fast store
//! - Degrades to the catalog when the fast store is unreachable
//! - Flushes pending deltas on a timer ([`SyncScheduler`])
//! - Warms the fast store from the catalog at startup ([`StartupLoader`])

pub mod config;
pub mod engine;
pub mod error;
pub mod fast_store;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod service;
pub mod shutdown;
pub mod sync;
pub mod tracing_spans;

pub use config::{DeltaClearMode, HotnessConfig};
pub use engine::HotnessEngine;
pub use error::HotnessError;
pub use fast_store::FastStore;
pub use loader::{LoadReport, StartupLoader};
pub use logging::{init_logging, LogFormat};
pub use metrics::HotnessMetrics;
pub use service::HotnessService;
pub use shutdown::ShutdownController;
pub use sync::{SyncReport, SyncScheduler, SyncStatus};
