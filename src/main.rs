//! Crypto Stats - price analytics over `SYMBOL_values.csv` files
//!
//! Answers one query per run and prints the result as JSON on stdout. Logs go
//! to stderr.
//!
//! With the in-memory backend every command first ingests the prices
//! directory. With the SQLite backend only `ingest` reads the directory and
//! the queries serve what is already stored; each `ingest` run appends the
//! files again, so running it twice duplicates records.
//!
//! # Usage
//! ```sh
//! crypto-stats --prices-dir ./prices stats BTC
//! crypto-stats ranking
//! crypto-stats highest --day 20220101
//! ```
//!
//! # Environment Variables
//! - `PRICES_DIR` - Directory with the price files (default: ./prices)
//! - `STORAGE_BACKEND` - `memory` or `sqlite` (default: memory)
//! - `DATABASE_URL` - SQLite URL (default: sqlite://crypto_prices.db)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crypto_stats::application::bootstrap::ServicesBootstrap;
use crypto_stats::config::{Config, StorageBackend};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Crypto price statistics", long_about = None)]
struct Cli {
    /// Directory with SYMBOL_values.csv files (overrides PRICES_DIR)
    #[arg(long, global = true)]
    prices_dir: Option<PathBuf>,

    /// Storage backend: memory or sqlite (overrides STORAGE_BACKEND)
    #[arg(long, global = true)]
    storage: Option<String>,

    /// SQLite URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the prices directory and print the ingestion summary
    Ingest,
    /// Oldest/newest/min/max prices for a symbol
    Stats {
        /// Crypto symbol, e.g. BTC (case-sensitive)
        symbol: String,
    },
    /// All symbols sorted by normalized range, highest first
    Ranking,
    /// Symbol with the highest normalized range on a day
    Highest {
        /// Day in YYYYMMDD format (UTC)
        #[arg(short, long)]
        day: String,
    },
}

#[derive(Serialize)]
struct IngestSummary {
    files_ingested: usize,
    records_stored: usize,
    rejected: Vec<RejectedSummary>,
    directory_error: Option<String>,
}

#[derive(Serialize)]
struct RejectedSummary {
    file: String,
    error: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.prices_dir {
        config.prices_dir = dir;
    }
    if let Some(storage) = cli.storage {
        config.storage_backend = StorageBackend::from_str(&storage)?;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    info!(
        "Configuration loaded: PricesDir={}, Storage={}",
        config.prices_dir.display(),
        config.storage_backend
    );

    let ingest = matches!(cli.command, Commands::Ingest) || !config.storage_backend.is_persistent();
    let services = ServicesBootstrap::init(&config, ingest).await?;
    let query = services.query_service.clone();

    let outcome = match cli.command {
        Commands::Ingest => {
            let report = services.startup_ingestion.clone().unwrap_or_default();
            Ok(print_json(&IngestSummary {
                files_ingested: report.files_ingested,
                records_stored: report.records_stored,
                rejected: report
                    .rejected
                    .into_iter()
                    .map(|r| RejectedSummary {
                        file: r.file_name,
                        error: r.error.to_string(),
                    })
                    .collect(),
                directory_error: report.directory_error.map(|e| e.to_string()),
            }))
        }
        Commands::Stats { symbol } => query.stats(&symbol).await.map(|stats| print_json(&stats)),
        Commands::Ranking => query.normalized_list().await.map(|list| print_json(&list)),
        Commands::Highest { day } => query
            .normalized_highest(&day)
            .await
            .map(|symbol| print_json(&symbol)),
    };

    services.shutdown().await;

    match outcome {
        Ok(printed) => printed,
        Err(e) => {
            let status = e.status_code();
            error!("Request failed ({}): {}", status, e);
            std::process::exit(if status >= 500 { 2 } else { 1 });
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
