//! feed-snapshot binary entrypoint
//!
//! `run` sweeps every configured feed once and exits; `serve` does the same at
//! startup and then on the configured cron schedule until Ctrl-C; `check`
//! validates the configuration and prints the feed table.
//!
//! Per-feed failures are logged and never change the exit code. Only startup
//! errors (configuration, store, scheduler) exit non-zero.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_snapshot::config::AppConfig;
use feed_snapshot::{IngestScheduler, Pipeline};

#[derive(Parser)]
#[command(name = "feed-snapshot", version, about = "Keep a 24h snapshot of syndication feeds in a document store")]
struct Cli {
    /// Config file (TOML or JSON). Defaults to $FEED_SNAPSHOT_CONFIG, then config/feed-snapshot.{toml,json}.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once and exit.
    Run,
    /// Run at startup (unless disabled) and then on schedule until Ctrl-C.
    Serve,
    /// Validate configuration and list feeds.
    Check,
}

/// Compact logs by default, JSON lines when LOG_FORMAT=json.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feed_snapshot=info,ingest=info,store=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    match path {
        Some(p) => AppConfig::load_from(&p),
        None => AppConfig::load_default(),
    }
}

fn print_feeds(cfg: &AppConfig) {
    println!("{} feed(s)", cfg.feeds.len());
    for f in &cfg.feeds {
        println!(
            "  {:<24} {} {}",
            f.collection,
            f.url,
            f.source.as_deref().map(|s| format!("[{s}]")).unwrap_or_default()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config(cli.config).context("loading configuration")?;
    if cfg.feeds.is_empty() {
        tracing::warn!("no feeds configured");
    }

    let command = cli.command.unwrap_or(Command::Run);
    if !matches!(command, Command::Check) {
        if let Some(addr) = cfg.metrics.listen {
            feed_snapshot::metrics::install_exporter(addr)?;
        }
    }

    match command {
        Command::Check => {
            feed_snapshot::ingest::scheduler::normalize_cron(&cfg.schedule.cron)?;
            feed_snapshot::ingest::scheduler::parse_timezone(&cfg.schedule.timezone)?;
            print_feeds(&cfg);
        }
        Command::Run => {
            // per-feed failures and the run summary are logged by the pipeline
            Pipeline::from_config(&cfg)?.run().await;
        }
        Command::Serve => {
            let pipeline = Arc::new(Pipeline::from_config(&cfg)?);
            let mut scheduler = IngestScheduler::new(pipeline.clone(), &cfg.schedule).await?;
            scheduler.start().await?;

            if cfg.schedule.run_on_start {
                tracing::info!("initial run at startup");
                pipeline.run().await;
            }

            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            tracing::info!("shutdown requested");
            scheduler.stop().await?;
        }
    }

    Ok(())
}
