//! Settlement Simulator - Main entry point
//!
//! Drives the CZRpay settlement engine against an in-memory chain: blocks
//! are mined on a timer, new matches appear at random, and the engine's
//! ticker settles whatever becomes eligible. Optionally watches the config
//! file and applies `auto_settle` changes while running.

mod chain;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use czrpay_config::{
    validate_config, AppConfig, ConfigLoader, ConfigWatcher, StoreBackend, ENV_PREFIX,
};
use czrpay_engine::{spawn_ticker, Collaborators, EngineOptions, SettlementEngine, TracingNotifier};
use czrpay_metrics::{init_tracing_with_metrics, LoggingOptions, MetricsCollector};
use czrpay_settlement::{InMemoryStore, SettlementStore, SqliteStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::chain::{ChainSettings, SimulatedChain};

/// Settlement Simulator CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (TOML, YAML or JSON); defaults plus environment otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reload the config file on change and apply auto_settle live
    #[arg(long)]
    watch: bool,

    /// Number of blocks to mine
    #[arg(long, default_value = "40")]
    blocks: u64,

    /// Milliseconds between blocks
    #[arg(long, default_value = "250")]
    block_ms: u64,

    /// Ticker period in milliseconds; defaults to the block interval
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Matches already pending when the simulator starts
    #[arg(long, default_value = "3")]
    initial_matches: usize,

    /// Chance of a new match per block
    #[arg(long, default_value = "0.3")]
    match_rate: f64,

    /// Chance that a broadcast is rejected
    #[arg(long, default_value = "0.1")]
    failure_rate: f64,

    /// Settlement asset balance of each local address, in raw units
    #[arg(long, default_value = "500000000")]
    starting_balance: u128,

    /// Override the configured auto-settle preference
    #[arg(long)]
    auto_settle: Option<bool>,

    #[arg(long, default_value = "1")]
    seed: u64,
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let config = match &args.config {
        Some(path) => ConfigLoader::from_file_with_env(path, ENV_PREFIX)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::from_env()?,
    };
    validate_config(&config)?;
    Ok(config)
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn SettlementStore>> {
    let store: Arc<dyn SettlementStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
        StoreBackend::Sqlite => {
            let path = config
                .store
                .sqlite_path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("store.sqlite_path is required for sqlite"))?;
            Arc::new(SqliteStore::new(path).await?)
        }
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.match_rate) && (0.0..=1.0).contains(&args.failure_rate),
        "rates must be between 0 and 1"
    );

    let config = load_config(&args)?;
    let collector = Arc::new(MetricsCollector::new());
    init_tracing_with_metrics(
        &LoggingOptions {
            level: config.network.log_level.clone(),
            json: config.network.json_logs,
        },
        collector.clone(),
    )?;

    info!("Starting Settlement Simulator");
    info!("  Environment: {:?}", config.network.environment);
    info!("  Store: {:?}", config.store.backend);
    info!("  Wait blocks: {}", config.settlement.wait_blocks);

    let chain = Arc::new(SimulatedChain::new(
        ChainSettings {
            start_height: 1_000,
            settlement_asset: config.settlement.settlement_asset.clone(),
            failure_rate: args.failure_rate,
            latency_range: (5, 25),
            starting_balance: args.starting_balance,
            seed: args.seed,
        },
        vec!["1SimSeller".to_string(), "1SimSpare".to_string()],
    ));

    let mut options = EngineOptions::from_config(&config.settlement);
    if let Some(auto_settle) = args.auto_settle {
        options.auto_settle = auto_settle;
    }
    let collaborators = Collaborators {
        wallet: chain.clone(),
        match_feed: chain.clone(),
        pending_actions: chain.clone(),
        notifier: Arc::new(TracingNotifier),
    };
    let mut engine = SettlementEngine::new(options, collaborators, open_store(&config).await?);
    if config.network.metrics_enabled {
        engine = engine.with_metrics(collector.clone());
    }
    let engine = Arc::new(engine);

    // Matches that predate this run
    for i in 0..args.initial_matches {
        chain.spawn_match(i % 3 == 2).await;
        chain.advance().await;
    }
    let report = engine.restore().await?;
    info!(
        upcoming = report.upcoming,
        waiting = report.waiting,
        retry_eligible = report.retry_eligible,
        settled = report.settled,
        "Engine restored"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let period = Duration::from_millis(args.tick_ms.unwrap_or(args.block_ms));
    let ticker = spawn_ticker(engine.clone(), period, shutdown_rx.clone());

    let mut watcher_handles = Vec::new();
    if args.watch {
        let path = args
            .config
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--watch requires --config"))?;
        let (watcher, handle) = ConfigWatcher::watch(path)?;
        watcher_handles.push(handle);

        let mut updates = watcher.subscribe();
        let engine = engine.clone();
        let mut shutdown = shutdown_rx.clone();
        watcher_handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let auto_settle = updates.borrow().settlement.auto_settle;
                        engine.set_auto_settle(auto_settle);
                    }
                    _ = shutdown.changed() => break,
                }
            }
        }));
    }

    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(1));
    for _ in 0..args.blocks {
        tokio::time::sleep(Duration::from_millis(args.block_ms)).await;

        for match_id in chain.advance().await {
            engine.settlement_confirmed(match_id.as_str()).await;
        }

        if rng.gen_bool(args.match_rate) {
            let record = chain.spawn_match(rng.gen_bool(0.25)).await;
            if let Err(e) = engine.ingest_match(&record).await {
                warn!(error = %e, "Failed to ingest match");
            }
        }

        // A user working through the waiting list by hand
        if !engine.auto_settle() || rng.gen_bool(0.2) {
            let waiting = engine.waiting_snapshot().await?;
            if let Some(view) = waiting.first() {
                match engine.complete_settlement(view.match_id.as_str()).await {
                    Ok(outcome) => info!(match_id = %view.match_id, ?outcome, "Manual settlement"),
                    Err(e) => info!(match_id = %view.match_id, error = %e, "Manual settlement refused"),
                }
            }
        }

        if rng.gen_bool(0.05) {
            chain.fund("1SimSeller", 100_000_000).await;
        }
    }

    shutdown_tx.send(true).ok();
    ticker.await?;
    for handle in watcher_handles {
        handle.abort();
    }

    println!("\n=== Upcoming ===");
    println!("{}", serde_json::to_string_pretty(&engine.upcoming_snapshot().await?)?);
    println!("\n=== Waiting ===");
    println!("{}", serde_json::to_string_pretty(&engine.waiting_snapshot().await?)?);
    println!("\nHeight: {}", chain.height().await);
    println!("Pending obligations: {}", engine.total_pending_count().await);

    if config.network.metrics_enabled {
        println!("\n=== Metrics ===");
        println!("{}", collector.encode()?);
    }

    Ok(())
}
