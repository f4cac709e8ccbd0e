// src/summary/mod.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::process::{load_report, TotalsRecord};
use crate::store::{date_from_filename, shared_temp_in, ReportStore};

pub const DEFAULT_OUTPUT: &str = "summary.csv";

/// One line of the summary table. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub date: NaiveDate,
    pub total_registered: Option<f64>,
    pub total_eligible: Option<f64>,
    pub total_pledged: Option<f64>,
    pub combined_total: Option<f64>,
    pub delta_registered: Option<f64>,
    pub delta_combined: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutcome {
    NoData,
    Written { path: PathBuf, rows: usize },
}

fn delta(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    Some(current? - previous?)
}

/// Deduplicate by date (later records win), sort ascending and fill in the
/// day-over-day deltas against the preceding row.
pub fn build_summary<I>(records: I) -> Vec<SummaryRow>
where
    I: IntoIterator<Item = TotalsRecord>,
{
    let mut by_date: BTreeMap<NaiveDate, TotalsRecord> = BTreeMap::new();
    for rec in records {
        by_date.insert(rec.date, rec);
    }

    let mut rows = Vec::with_capacity(by_date.len());
    let mut prev: Option<(Option<f64>, Option<f64>)> = None;
    for (date, rec) in by_date {
        let t = rec.totals;
        let (delta_registered, delta_combined) = match prev {
            Some((prev_reg, prev_comb)) => (
                delta(t.total_registered, prev_reg),
                delta(t.combined_total, prev_comb),
            ),
            None => (None, None),
        };
        prev = Some((t.total_registered, t.combined_total));

        rows.push(SummaryRow {
            date,
            total_registered: t.total_registered,
            total_eligible: t.total_eligible,
            total_pledged: t.total_pledged,
            combined_total: t.combined_total,
            delta_registered,
            delta_combined,
        });
    }
    rows
}

/// Parse every report in the store in file-name order. A file that cannot be
/// dated or read is skipped with a warning.
pub fn collect_records(store: &ReportStore) -> Result<Vec<TotalsRecord>> {
    let paths = store.list_reports()?;
    info!(dir = %store.dir().display(), files = paths.len(), "scanning reports");

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        if date_from_filename(&path).is_none() {
            warn!(file = %path.display(), "skip file without date in name");
            continue;
        }
        match load_report(&path) {
            Ok(rec) => records.push(rec),
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(file = %path.display(), error = %reason, "skip unreadable report");
            }
        }
    }
    Ok(records)
}

/// Write `rows` as CSV with a header, replacing `path` atomically.
pub fn write_summary(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating output dir {:?}", dir))?;

    let tmp = shared_temp_in(dir)?;
    {
        let mut wtr = csv::Writer::from_writer(tmp.as_file());
        for row in rows {
            wtr.serialize(row).context("serializing summary row")?;
        }
        wtr.flush().context("flushing summary csv")?;
    }
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replacing {:?}", path))?;
    Ok(())
}

/// Run the whole aggregation: scan, extract, summarise, write.
/// Nothing is written when no report yields a record.
#[tracing::instrument(level = "info", skip(store, output), fields(output = %output.display()))]
pub fn aggregate(store: &ReportStore, output: &Path) -> Result<AggregateOutcome> {
    let records = collect_records(store)?;
    if records.is_empty() {
        info!("no data rows parsed; nothing to do");
        return Ok(AggregateOutcome::NoData);
    }

    let rows = build_summary(records);
    write_summary(output, &rows)?;
    info!(rows = rows.len(), "wrote summary");

    Ok(AggregateOutcome::Written {
        path: output.to_path_buf(),
        rows: rows.len(),
    })
}
