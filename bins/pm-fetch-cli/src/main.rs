//! Polymarket Market Fetch CLI
//!
//! Fetches every market listing and writes two JSON files: the full snapshot
//! with metadata and a flat list of market titles.
//!
//! # Usage
//! ```bash
//! # All markets via CLOB (full detail)
//! pm_fetch
//!
//! # Currently open markets via Gamma -> data/current_markets.json
//! pm_fetch --current
//!
//! # Closed markets, first 5 pages only, compact output
//! pm_fetch --closed --max-pages 5 --indent 0 --out closed.json
//! ```
//!
//! Exit code is 0 for any completed run, including partial ones (page
//! ceiling, Ctrl+C, mid-run fetch error). It is non-zero for invalid
//! configuration, when no page could be fetched, or when the markets
//! snapshot could not be written.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::{error, info, warn};

use market_fetch::snapshot::validate_output_paths;
use market_fetch::{
    ClientConfig, Endpoints, FetchConfig, FetchMode, Fetcher, MarketsClient, SnapshotWriter,
    CLOB_REST_BASE, GAMMA_API_BASE,
};

/// Safety limit against endless pagination
const DEFAULT_MAX_PAGES: u32 = 100;

#[derive(Parser)]
#[command(name = "pm_fetch")]
#[command(about = "Fetch all Polymarket markets and save to JSON files")]
#[command(version)]
#[command(group(ArgGroup::new("mode_flags").args(["current", "active", "closed", "all", "mode"])))]
struct Cli {
    /// Only current/open markets (active=true AND closed=false)
    #[arg(long)]
    current: bool,

    /// Only active markets (active=true, may include closed)
    #[arg(long)]
    active: bool,

    /// Only closed/resolved markets (closed=true)
    #[arg(long)]
    closed: bool,

    /// All markets via Gamma API (no filters)
    #[arg(long)]
    all: bool,

    /// Mode by name (current, active, closed, all, default)
    #[arg(long)]
    mode: Option<String>,

    /// Maximum pages to fetch (0 = unlimited)
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,

    /// Output path for the markets snapshot
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output path for market names
    #[arg(long)]
    names_out: Option<PathBuf>,

    /// Directory for default output file names
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,

    /// JSON indentation spaces (0 = compact)
    #[arg(long, default_value_t = 2)]
    indent: usize,

    /// CLOB API base URL (default mode)
    #[arg(long, default_value = CLOB_REST_BASE)]
    api_url: String,

    /// Gamma API base URL (filtered modes)
    #[arg(long, default_value = GAMMA_API_BASE)]
    gamma_url: String,

    /// Page size override (bounded by the API's ceiling)
    #[arg(long)]
    page_size: Option<u32>,

    /// Minimum delay between requests in milliseconds
    #[arg(long, default_value_t = 250)]
    delay_ms: u64,

    /// Retries per page on timeouts and 5xx
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Keep only active, unclosed markets in the snapshot
    #[arg(long, default_value = "false")]
    only_open: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn mode_name(&self) -> Option<&str> {
        if self.current {
            Some("current")
        } else if self.active {
            Some("active")
        } else if self.closed {
            Some("closed")
        } else if self.all {
            Some("all")
        } else {
            self.mode.as_deref()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    // Configuration errors abort before any request is made
    let endpoints = Endpoints::new(&cli.gamma_url, &cli.api_url)?;
    let mut config = FetchConfig::from_name(cli.mode_name(), &endpoints)?;
    if let Some(page_size) = cli.page_size {
        config = config.with_page_size(page_size)?;
    }

    let markets_path = cli.out.clone().unwrap_or_else(|| cli.out_dir.join(config.output.markets));
    let names_path = cli.names_out.clone().unwrap_or_else(|| cli.out_dir.join(config.output.names));
    validate_output_paths(&markets_path, &names_path)?;

    // Setup Ctrl+C handler
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, finishing current page...");
        shutdown_clone.store(true, Ordering::Relaxed);
    });

    run_fetch(&cli, config, markets_path, names_path, shutdown).await
}

async fn run_fetch(
    cli: &Cli,
    config: FetchConfig,
    markets_path: PathBuf,
    names_path: PathBuf,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let mode: FetchMode = config.mode;
    let max_pages = (cli.max_pages > 0).then_some(cli.max_pages);

    info!("=== Market Fetch ===");
    info!("Mode: {}", mode.description());
    info!("Endpoint: {}", config.endpoint);
    info!("Max pages: {}", max_pages.map_or("unlimited".to_string(), |n| n.to_string()));
    info!("Output: {} / {}", markets_path.display(), names_path.display());
    info!("");

    let client_config = ClientConfig::default()
        .with_request_delay(Duration::from_millis(cli.delay_ms))
        .with_max_retries(cli.max_retries);
    let client = MarketsClient::with_config(client_config)?;

    let session = Fetcher::new(client, config)
        .run(max_pages, shutdown)
        .await
        .context("Market fetch failed")?;

    if session.is_empty() {
        warn!("No {} markets fetched", mode.description());
    }

    let snapshot = session.into_snapshot(mode, cli.only_open);

    info!("");
    info!("=== Summary ===");
    info!("Markets: {}", snapshot.total_markets);
    if let Some(original) = snapshot.total_original_markets {
        info!("Before open filter: {}", original);
    }
    info!("Asset IDs: {}", snapshot.total_asset_ids);
    info!("Pages fetched: {}", snapshot.pages_fetched);
    info!("Duplicates skipped: {}", snapshot.duplicates_skipped);
    info!("Stop reason: {:?}", snapshot.stop_reason);
    if snapshot.partial {
        warn!("Snapshot is PARTIAL ({:?})", snapshot.stop_reason);
    }
    if let Some(err) = &snapshot.error {
        warn!("Last error: {}", err);
    }
    info!("");

    let report = SnapshotWriter::new(cli.indent).write(&snapshot, &markets_path, &names_path).await;

    if let Err(e) = &report.names {
        error!("Market names not saved: {}", e);
    }
    report.markets.context("Markets snapshot not saved")?;

    Ok(())
}
