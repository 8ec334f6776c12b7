//! Hotness daemon: runs the engine over an LMDB catalog and an in-process
//! fast store, and offers a small catalog admin surface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hotness_engine::{init_logging, FastStore, HotnessConfig, HotnessEngine, LogFormat};
use hotness_store::CatalogStore;
use hotness_store_lmdb::{LmdbCatalogStore, LmdbEnvironment};
use hotness_store_memory::MemoryFastStore;
use hotness_types::ItemId;

const LMDB_MAX_DBS: u32 = 4;

#[derive(Parser)]
#[command(name = "hotness-daemon", about = "View counting and popularity ranking daemon")]
struct Cli {
    /// Data directory for the LMDB catalog.
    #[arg(long, env = "HOTNESS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Sync period in milliseconds.
    #[arg(long, env = "HOTNESS_SYNC_INTERVAL_MS")]
    sync_interval_ms: Option<u64>,

    /// Dedup window in seconds.
    #[arg(long, env = "HOTNESS_DEDUP_WINDOW_SECS")]
    dedup_window_secs: Option<u64>,

    /// Default ranking page size.
    #[arg(long, env = "HOTNESS_RANKING_PAGE_SIZE")]
    ranking_page_size: Option<usize>,

    /// Print Prometheus metrics on shutdown.
    #[arg(long, env = "HOTNESS_ENABLE_METRICS")]
    metrics: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "HOTNESS_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "HOTNESS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the engine until SIGINT or SIGTERM.
    Run,
    /// Inspect or seed the durable catalog.
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(clap::Subcommand)]
enum CatalogAction {
    /// Register an item so its views can be recorded.
    Add {
        item: u64,
        /// Starting view count.
        #[arg(long, default_value_t = 0)]
        count: u64,
    },
    /// Print every item and its durable count.
    List,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<HotnessConfig> {
        let mut config = match &self.config {
            Some(path) => HotnessConfig::from_toml_file(&path.to_string_lossy())
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => HotnessConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(ms) = self.sync_interval_ms {
            config.sync_interval_ms = ms;
        }
        if let Some(secs) = self.dedup_window_secs {
            config.dedup_window_secs = secs;
        }
        if let Some(size) = self.ranking_page_size {
            config.ranking_page_size = size;
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config.enable_metrics |= self.metrics;

        config.validate()?;
        Ok(config)
    }
}

fn open_catalog(config: &HotnessConfig) -> anyhow::Result<LmdbCatalogStore> {
    let env = LmdbEnvironment::open(&config.data_dir, LMDB_MAX_DBS, config.lmdb_map_size)
        .with_context(|| format!("opening catalog at {}", config.data_dir.display()))?;
    Ok(env.catalog_store())
}

async fn run(config: HotnessConfig) -> anyhow::Result<()> {
    let catalog = Arc::new(open_catalog(&config)?);
    let fast = FastStore::shared(Arc::new(MemoryFastStore::new()), config.fast_store_timeout());
    let enable_metrics = config.enable_metrics;

    tracing::info!(
        data_dir = %config.data_dir.display(),
        sync_interval_ms = config.sync_interval_ms,
        "starting hotness daemon"
    );

    let mut engine = HotnessEngine::new(config, fast, catalog)?;
    let load = engine.start().await?;
    tracing::info!(seeded = load.seeded, "catalog loaded into fast store");

    engine.shutdown_controller().wait_for_signal().await;

    let report = engine.stop().await?;
    if report.failed > 0 || report.uncleared > 0 {
        tracing::warn!(
            failed = report.failed,
            uncleared = report.uncleared,
            "final sync left deltas behind"
        );
    }

    if enable_metrics {
        print!("{}", engine.metrics().encode_text());
    }

    tracing::info!("hotness daemon exited cleanly");
    Ok(())
}

fn catalog_command(config: &HotnessConfig, action: CatalogAction) -> anyhow::Result<()> {
    let catalog = open_catalog(config)?;
    match action {
        CatalogAction::Add { item, count } => {
            let item = ItemId::new(item)?;
            catalog.insert_item(item, count)?;
            tracing::info!(%item, count, "catalog item registered");
        }
        CatalogAction::List => {
            for (item, count) in catalog.read_all_counters()? {
                println!("{item}\t{count}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(LogFormat::from_config(&config.log_format), &config.log_level);

    match cli.command {
        Command::Run => run(config).await,
        Command::Catalog { action } => catalog_command(&config, action),
    }
}
