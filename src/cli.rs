//! Command-line configuration.
//!
//! Every flag can also be set through a `GOLDSTOCKS_*` environment variable so
//! the binary can be driven from a scheduler without a wrapper script.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::fetch::{FetchConfig, RetryPolicy, DEFAULT_REPORT_URL};
use crate::store::{ReportStore, DEFAULT_DATA_DIR, DEFAULT_EXTENSION, DEFAULT_PREFIX};
use crate::summary::DEFAULT_OUTPUT;

#[derive(Debug, Parser)]
#[command(
    name = "goldstocks",
    version,
    about = "Fetch the daily COMEX gold warehouse-stock report and summarise it"
)]
pub struct Cli {
    /// Directory holding the dated report files.
    #[arg(long, env = "GOLDSTOCKS_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    pub data_dir: PathBuf,

    /// File name prefix of stored reports.
    #[arg(long, env = "GOLDSTOCKS_REPORT_NAME", default_value = DEFAULT_PREFIX, global = true)]
    pub report_name: String,

    /// File extension of stored reports.
    #[arg(long, env = "GOLDSTOCKS_EXTENSION", default_value = DEFAULT_EXTENSION, global = true)]
    pub extension: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download today's report unless it is already stored.
    Fetch(FetchArgs),
    /// Rebuild the summary table from every stored report.
    Aggregate(AggregateArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Remote report location.
    #[arg(long, env = "GOLDSTOCKS_URL", default_value = DEFAULT_REPORT_URL)]
    pub url: Url,

    /// Retries after the first attempt.
    #[arg(long, env = "GOLDSTOCKS_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry.
    #[arg(long, env = "GOLDSTOCKS_BACKOFF_SECS", default_value_t = 5)]
    pub backoff_secs: u64,

    #[arg(long, env = "GOLDSTOCKS_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout.
    #[arg(long, env = "GOLDSTOCKS_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Store the download under this date (YYYY-MM-DD) instead of today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Summary CSV to (over)write.
    #[arg(long, short, env = "GOLDSTOCKS_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

impl Cli {
    pub fn store(&self) -> ReportStore {
        ReportStore::new(&self.data_dir, &self.report_name, &self.extension)
    }
}

impl FetchArgs {
    pub fn config(&self) -> FetchConfig {
        FetchConfig {
            url: self.url.clone(),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_secs(self.backoff_secs),
            },
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            ..FetchConfig::default()
        }
    }
}
