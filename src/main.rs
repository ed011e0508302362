// src/main.rs

//! courtwatch CLI
//!
//! Local execution entry point: run the scheduler daemon, fire a single
//! tick, or validate configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use courtwatch::config::load_validated;
use courtwatch::error::Result;
use courtwatch::pipeline::{Scheduler, TickRunner, TickServices};
use courtwatch::services::{BoardParser, HttpBoardSource, LoggingBroadcaster, LoggingGateway};
use courtwatch::storage::MemoryStore;

/// How long shutdown waits for an in-flight tick to drain.
const SHUTDOWN_DRAIN_SECS: u64 = 10;

/// courtwatch - Courtroom display-board watcher
#[derive(Parser, Debug)]
#[command(name = "courtwatch", version, about = "Courtroom display-board watcher")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "courtwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler daemon
    Run,

    /// Execute a single tick and exit
    Once,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run => run_daemon(&cli.config).await?,
        Command::Once => run_once(&cli.config).await?,
        Command::Validate => {
            log::info!("Validating configuration...");
            let config = load_validated(&cli.config)?;
            log::info!("✓ Config OK");
            log::info!("  Board page: {}", config.upstream.base_url);
            log::info!("  XHR endpoint: {}", config.upstream.xhr_url);
            log::info!("  Interval: {}ms", config.scraper.interval_ms);
            if !config.push.has_credentials() {
                log::warn!("No push credentials configured; alerts will only be logged");
            }
        }
    }

    Ok(())
}

fn build_runner(config: &courtwatch::models::Config, store: Arc<MemoryStore>) -> Result<TickRunner> {
    let source = HttpBoardSource::new(&config.upstream)?;
    let parser = BoardParser::new(&config.upstream.base_url)?;

    let services = TickServices {
        courts: store.clone(),
        watchlists: store.clone(),
        history: store.clone(),
        devices: store.clone(),
        ledger: store,
        gateway: Arc::new(LoggingGateway),
        broadcaster: Arc::new(LoggingBroadcaster),
    };

    Ok(TickRunner::new(Box::new(source), parser, services))
}

/// Run the scheduler until interrupted.
async fn run_daemon(config_path: &PathBuf) -> Result<()> {
    let config = load_validated(config_path)?;

    if !config.scraper.enabled {
        log::warn!("Scraper disabled by configuration; nothing to schedule");
        return Ok(());
    }
    if !config.push.has_credentials() {
        log::warn!("No push credentials configured; alerts will only be logged");
    }

    let store = Arc::new(MemoryStore::new());
    let runner = build_runner(&config, store.clone())?;
    let scheduler = Scheduler::new(
        runner,
        store,
        Duration::from_millis(config.scraper.interval_ms),
    );

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(cancel.clone()));

    log::info!(
        "courtwatch running (interval {}ms); press Ctrl-C to stop",
        config.scraper.interval_ms
    );
    tokio::signal::ctrl_c().await?;

    log::info!("Shutting down; draining in-flight tick...");
    cancel.cancel();
    if tokio::time::timeout(Duration::from_secs(SHUTDOWN_DRAIN_SECS), handle)
        .await
        .is_err()
    {
        log::warn!("Tick did not drain within {SHUTDOWN_DRAIN_SECS}s; exiting anyway");
    }

    Ok(())
}

/// Fire one tick and report the outcome.
async fn run_once(config_path: &PathBuf) -> Result<()> {
    let config = load_validated(config_path)?;
    let store = Arc::new(MemoryStore::new());
    let mut runner = build_runner(&config, store)?;

    let report = runner.run_tick().await?;
    match report.stats() {
        Some(stats) => log::info!(
            "Tick complete: {} courts parsed, {} changed, {} alerts",
            stats.parsed_courts,
            stats.changed_courts,
            stats.alerts_sent
        ),
        None => log::info!("Tick skipped: board not modified"),
    }

    Ok(())
}
