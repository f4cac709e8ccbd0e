use anyhow::Result;
use chrono::Local;
use clap::Parser;
use goldstocks::{
    cli::{Cli, Command, FetchArgs},
    fetch::{self, FetchError, FetchOutcome},
    store::ReportStore,
    summary::{self, AggregateOutcome},
};
use std::{path::Path, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    let store = cli.store();

    // ─── 2) dispatch ─────────────────────────────────────────────────
    let result = match &cli.command {
        Command::Fetch(args) => run_fetch(args, &store).await,
        Command::Aggregate(args) => run_aggregate(&args.output, &store),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(FetchError::Status {
                status, preview, ..
            }) = e.downcast_ref::<FetchError>()
            {
                error!(%status, "HTTP error from report server");
                if !preview.is_empty() {
                    error!("response preview:\n{}", preview);
                }
            }
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_fetch(args: &FetchArgs, store: &ReportStore) -> Result<()> {
    let cfg = args.config();
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let client = fetch::build_client(&cfg)?;

    match fetch::fetch_report(&client, &cfg, store, date).await? {
        FetchOutcome::AlreadyPresent(path) => {
            info!(path = %path.display(), "nothing to download")
        }
        FetchOutcome::Downloaded { path, bytes } => {
            info!(path = %path.display(), bytes, "download complete")
        }
    }
    Ok(())
}

fn run_aggregate(output: &Path, store: &ReportStore) -> Result<()> {
    match summary::aggregate(store, output)? {
        AggregateOutcome::NoData => info!("no data found; summary not written"),
        AggregateOutcome::Written { path, rows } => {
            info!(path = %path.display(), rows, "summary written")
        }
    }
    Ok(())
}
