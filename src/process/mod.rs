// src/process/mod.rs
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::store::date_from_filename;

pub mod utils;

#[cfg(test)]
pub(crate) mod test_workbook;

use utils::{cell_label, last_numeric};

/// The four summary rows of a warehouse-stock report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TotalKind {
    Registered,
    Eligible,
    Pledged,
    Combined,
}

impl TotalKind {
    pub const ALL: [TotalKind; 4] = [
        TotalKind::Registered,
        TotalKind::Eligible,
        TotalKind::Pledged,
        TotalKind::Combined,
    ];

    /// Upper-case prefix the row label must start with.
    pub fn label(&self) -> &'static str {
        match self {
            TotalKind::Registered => "TOTAL REGISTERED",
            TotalKind::Eligible => "TOTAL ELIGIBLE",
            TotalKind::Pledged => "TOTAL PLEDGED",
            TotalKind::Combined => "COMBINED TOTAL",
        }
    }

    fn matching(label: &str) -> Option<TotalKind> {
        TotalKind::ALL
            .into_iter()
            .find(|k| label.starts_with(k.label()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total_registered: Option<f64>,
    pub total_eligible: Option<f64>,
    pub total_pledged: Option<f64>,
    pub combined_total: Option<f64>,
}

impl Totals {
    pub fn get(&self, kind: TotalKind) -> Option<f64> {
        match kind {
            TotalKind::Registered => self.total_registered,
            TotalKind::Eligible => self.total_eligible,
            TotalKind::Pledged => self.total_pledged,
            TotalKind::Combined => self.combined_total,
        }
    }

    fn slot(&mut self, kind: TotalKind) -> &mut Option<f64> {
        match kind {
            TotalKind::Registered => &mut self.total_registered,
            TotalKind::Eligible => &mut self.total_eligible,
            TotalKind::Pledged => &mut self.total_pledged,
            TotalKind::Combined => &mut self.combined_total,
        }
    }

    /// Labels whose value is null, whether the row was absent or had no number.
    pub fn missing(&self) -> Vec<TotalKind> {
        TotalKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_none())
            .collect()
    }
}

/// The extracted figures for one report date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRecord {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Scan rows top to bottom. The first row whose label starts with a known
/// prefix claims that total; its value is the last numeric cell in the row.
/// Later rows with the same prefix are ignored even if the first had no number.
pub fn extract_totals<'a, I>(rows: I) -> (Totals, Vec<TotalKind>)
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut totals = Totals::default();
    let mut seen: Vec<TotalKind> = Vec::with_capacity(TotalKind::ALL.len());

    for (idx, row) in rows.into_iter().enumerate() {
        let Some(first) = row.first() else { continue };
        let label = cell_label(first);
        let Some(kind) = TotalKind::matching(&label) else {
            continue;
        };
        if seen.contains(&kind) {
            continue;
        }
        seen.push(kind);

        let value = last_numeric(row);
        debug!(row = idx, label = kind.label(), ?value, "matched total row");
        *totals.slot(kind) = value;

        if seen.len() == TotalKind::ALL.len() {
            break;
        }
    }

    let not_found = TotalKind::ALL
        .into_iter()
        .filter(|k| !seen.contains(k))
        .collect();
    (totals, not_found)
}

/// Open any calamine-supported workbook and return its first worksheet.
pub fn read_first_sheet(path: &Path) -> Result<Range<Data>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {:?}", path))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook {:?} has no worksheets", path))?
        .with_context(|| format!("Failed to read first worksheet of {:?}", path))
}

/// Extract the totals of one dated report file. Missing labels and rows
/// without numbers become nulls and are logged, never fatal.
#[tracing::instrument(level = "info", skip(path), fields(file = %path.display()))]
pub fn load_report(path: &Path) -> Result<TotalsRecord> {
    let date = date_from_filename(path)
        .ok_or_else(|| anyhow!("no YYYYMMDD date in file name {:?}", path))?;

    info!("parsing report");
    let range = read_first_sheet(path)?;
    let (totals, not_found) = extract_totals(range.rows());

    for kind in &not_found {
        warn!(label = kind.label(), "no row for label");
    }
    for kind in totals.missing() {
        if !not_found.contains(&kind) {
            warn!(label = kind.label(), "row has no numeric cell");
        }
    }

    Ok(TotalsRecord { date, totals })
}
