//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::HotnessError;

/// How the sync scheduler clears a pending delta after flushing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaClearMode {
    /// Atomically subtract the flushed snapshot. Views that arrive between the
    /// snapshot and the clear stay pending for the next run.
    Subtract,
    /// Zero the delta. Views that arrive between the snapshot and the clear are
    /// never flushed to the catalog.
    Reset,
}

/// Configuration for the hotness engine.
///
/// Can be loaded from a TOML file via [`HotnessConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HotnessConfig {
    /// Period of the sync scheduler, in milliseconds.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    /// Number of items returned by a ranking query that asks for zero.
    #[serde(default = "default_ranking_page_size")]
    pub ranking_page_size: usize,

    /// Window inside which repeated views from one originator count once.
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,

    /// Upper bound on any single fast-store call; exceeding it counts as an outage.
    #[serde(default = "default_fast_store_timeout_ms")]
    pub fast_store_timeout_ms: u64,

    /// How flushed deltas are cleared.
    #[serde(default = "default_delta_clear_mode")]
    pub delta_clear_mode: DeltaClearMode,

    /// Period of the expired dedup marker sweep, in milliseconds.
    #[serde(default = "default_dedup_sweep_interval_ms")]
    pub dedup_sweep_interval_ms: u64,

    /// Data directory for the LMDB catalog.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to print the Prometheus text exposition on shutdown.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_sync_interval_ms() -> u64 {
    300_000
}

fn default_ranking_page_size() -> usize {
    100
}

fn default_dedup_window_secs() -> u64 {
    1
}

fn default_fast_store_timeout_ms() -> u64 {
    200
}

fn default_delta_clear_mode() -> DeltaClearMode {
    DeltaClearMode::Subtract
}

fn default_dedup_sweep_interval_ms() -> u64 {
    30_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./hotness_data")
}

fn default_lmdb_map_size() -> usize {
    64 * 1024 * 1024
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl HotnessConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, HotnessError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| HotnessError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, HotnessError> {
        toml::from_str(s).map_err(|e| HotnessError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, HotnessError> {
        toml::to_string_pretty(self).map_err(|e| HotnessError::Config(e.to_string()))
    }

    /// Reject values that would stall a background task or make every
    /// fast-store call time out immediately.
    pub fn validate(&self) -> Result<(), HotnessError> {
        if self.sync_interval_ms == 0 {
            return Err(HotnessError::Config("sync_interval_ms must be > 0".into()));
        }
        if self.ranking_page_size == 0 {
            return Err(HotnessError::Config("ranking_page_size must be > 0".into()));
        }
        if self.fast_store_timeout_ms == 0 {
            return Err(HotnessError::Config(
                "fast_store_timeout_ms must be > 0".into(),
            ));
        }
        if self.dedup_sweep_interval_ms == 0 {
            return Err(HotnessError::Config(
                "dedup_sweep_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    pub fn fast_store_timeout(&self) -> Duration {
        Duration::from_millis(self.fast_store_timeout_ms)
    }

    pub fn dedup_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.dedup_sweep_interval_ms)
    }
}

impl Default for HotnessConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: default_sync_interval_ms(),
            ranking_page_size: default_ranking_page_size(),
            dedup_window_secs: default_dedup_window_secs(),
            fast_store_timeout_ms: default_fast_store_timeout_ms(),
            delta_clear_mode: default_delta_clear_mode(),
            dedup_sweep_interval_ms: default_dedup_sweep_interval_ms(),
            data_dir: default_data_dir(),
            lmdb_map_size: default_lmdb_map_size(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
