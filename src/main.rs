mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use seekfile_cache::{Database, Repository};
use seekfile_config::Config;
use seekfile_index::store::StoreHandle;
use seekfile_index::{Indexer, ScanMode};
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).or_raise(|| ErrorKind::Output)?;
    writeln!(stdout).or_raise(|| ErrorKind::Output)
}

async fn scan(indexer: &Indexer, mode: ScanMode) -> Result<()> {
    let token = CancellationToken::new();
    indexer.start_scan(&token, mode).or_raise(|| ErrorKind::Index)?;
    let status = tokio::select! {
        status = indexer.wait_idle() => status,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; stopping scan");
            indexer.stop_scan();
            indexer.wait_idle().await
        },
    };
    print_json(&status)
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
    .or_raise(|| ErrorKind::Config)?;
    tracing::debug!(?config, "Configuration loaded");

    let db = Database::connect(&config.database_path).await.or_raise(|| ErrorKind::Cache)?;
    let store: StoreHandle = Arc::new(Repository::from(&db));
    let indexer = Indexer::new(&config.scan_paths, store).or_raise(|| ErrorKind::Index)?;
    indexer.load_from_store().await.or_raise(|| ErrorKind::Index)?;

    let result = match cli.command {
        Command::Scan { full } => {
            let mode = if full || config.rebuild_on_start { ScanMode::Full } else { ScanMode::Incremental };
            scan(&indexer, mode).await
        },
        Command::Search(args) => print_json(&indexer.search(&CancellationToken::new(), &args.into_query())),
        Command::Status => print_json(&indexer.status()),
    };
    db.close().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}
