use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use cellfix::{
    config, remote::DEFAULT_ENDPOINT, CellLocator, DatasetLoader, MissingToken, Resolution,
    TcpProbe, TowerCache, TowerId, TowerResolver, UnwiredClient,
};

#[derive(Debug, Parser)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest the reference dataset into the cache
    Import { path: Option<PathBuf> },
    /// Resolve one tower identity to coordinates
    Resolve {
        mcc: u16,
        mnc: u16,
        lac: i64,
        cid: i64,
    },
    /// Show cache size and population state
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let path = match cli.config.as_deref() {
        Some(x) => x,
        None => Path::new("config.toml"),
    };
    let config = config::load(path)?;

    let cache = TowerCache::open(&config.database_path).await?;

    match cli.command {
        Command::Import { path } => {
            let path = path
                .or_else(|| config.dataset_path.clone())
                .context("no dataset: pass a path or set dataset_path in the config")?;
            let loader = DatasetLoader::new(cache);
            match loader.populate_from_path(&path).await? {
                Some(report) => println!(
                    "ingested {} rows, skipped {} malformed",
                    report.inserted, report.malformed
                ),
                None => println!("cache already populated, nothing to do"),
            }
        }

        Command::Resolve { mcc, mnc, lac, cid } => {
            // same ingestion the import command runs, but a failure here
            // must not prevent the resolution itself
            if let Some(dataset) = &config.dataset_path {
                let loader = DatasetLoader::new(cache.clone());
                if let Err(e) = loader.populate_from_path(dataset).await {
                    warn!("dataset ingestion failed, continuing without it: {e:#}");
                }
            }

            let endpoint = config
                .unwiredlabs
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
            // a populated cache answers without a token; only a miss needs one
            let locator: Arc<dyn CellLocator> = match config.token() {
                Ok(token) => Arc::new(UnwiredClient::new(&endpoint, token)),
                Err(e) => Arc::new(MissingToken(format!("{e:#}"))),
            };
            let resolver = TowerResolver::new(cache, locator, Arc::new(TcpProbe::default()));

            let tower = TowerId { mcc, mnc, lac, cid };
            match resolver.resolve(tower).await {
                Resolution::Found { lat, lon, source } => println!("{lat} {lon} ({source})"),
                Resolution::NetworkUnavailable => {
                    bail!("offline and no cached position for {tower}")
                }
                Resolution::RemoteError { detail } => bail!("remote lookup failed: {detail}"),
                Resolution::NotFound => bail!("no known position for {tower}"),
            }
        }

        Command::Stats => {
            println!("towers: {}", cache.count().await?);
            println!("populated: {}", cache.is_populated().await?);
        }
    };

    Ok(())
}
