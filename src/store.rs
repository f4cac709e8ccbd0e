// src/store.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use glob::glob;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PREFIX: &str = "Gold_Stocks";
pub const DEFAULT_EXTENSION: &str = "xls";

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{8})").expect("date regex is valid"));

/// A directory of dated raw report snapshots named `<prefix>_<YYYYMMDD>.<ext>`.
///
/// Files are append-only: once a date has been written it is never replaced.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR, DEFAULT_PREFIX, DEFAULT_EXTENSION)
    }
}

impl ReportStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self, date: NaiveDate) -> String {
        format!(
            "{}_{}.{}",
            self.prefix,
            date.format("%Y%m%d"),
            self.extension
        )
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(self.file_name(date))
    }

    /// All files matching `<prefix>_*.<ext>`, sorted by file name.
    /// A missing directory is treated as an empty store.
    pub fn list_reports(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "report dir does not exist");
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/{}_*.{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            glob::Pattern::escape(&self.prefix),
            glob::Pattern::escape(&self.extension)
        );

        let mut paths = Vec::new();
        for entry in glob(&pattern).context("invalid glob pattern for report store")? {
            match entry {
                Ok(p) if p.is_file() => paths.push(p),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "cannot read glob entry"),
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    /// Persist `bytes` as the report for `date`.
    ///
    /// The bytes land in a temp file first and are moved into place only if no
    /// file exists for that date yet.
    pub fn write_report(&self, date: NaiveDate, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating report dir {:?}", self.dir))?;

        let path = self.path_for(date);
        let mut tmp = shared_temp_in(&self.dir)?;
        tmp.write_all(bytes)
            .with_context(|| format!("writing report bytes for {}", date))?;
        tmp.persist_noclobber(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("persisting {:?}", path))?;

        Ok(path)
    }
}

/// Temp file in `dir` with ordinary `rw-r--r--` permissions, so the file
/// it is persisted as is readable like any other output.
pub(crate) fn shared_temp_in(dir: &Path) -> Result<NamedTempFile> {
    let tmp =
        NamedTempFile::new_in(dir).with_context(|| format!("creating temp file in {:?}", dir))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .with_context(|| format!("setting permissions on {:?}", tmp.path()))?;
    }
    Ok(tmp)
}

/// First 8-digit run in the file stem, read as `YYYYMMDD`.
pub fn date_from_filename(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let caps = DATE_RE.captures(stem)?;
    NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok()
}
