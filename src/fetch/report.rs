// src/fetch/report.rs

use anyhow::Result;
use chrono::NaiveDate;
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;

use super::{get_bytes_with_retry, FetchConfig};
use crate::store::ReportStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A file for this date was already on disk; no request was made.
    AlreadyPresent(PathBuf),
    Downloaded { path: PathBuf, bytes: usize },
}

impl FetchOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            FetchOutcome::AlreadyPresent(path) | FetchOutcome::Downloaded { path, .. } => path,
        }
    }
}

/// Make sure the report for `date` exists in `store`, downloading it if needed.
///
/// Failures leave the store untouched. A [`super::FetchError`] is carried
/// inside the returned `anyhow::Error` when the remote side is at fault.
#[tracing::instrument(level = "info", skip(client, cfg, store), fields(url = %cfg.url))]
pub async fn fetch_report(
    client: &Client,
    cfg: &FetchConfig,
    store: &ReportStore,
    date: NaiveDate,
) -> Result<FetchOutcome> {
    let path = store.path_for(date);
    if path.exists() {
        info!(path = %path.display(), "report already present for today");
        return Ok(FetchOutcome::AlreadyPresent(path));
    }

    info!(%date, "downloading report");
    let bytes = get_bytes_with_retry(client, &cfg.url, cfg.retry, cfg.preview_bytes).await?;
    let len = bytes.len();
    let path = store.write_report(date, &bytes)?;
    info!(path = %path.display(), bytes = len, "saved report");

    Ok(FetchOutcome::Downloaded { path, bytes: len })
}
