//! JSON Lines audit store
//!
//! Each calendar day (UTC) gets one file named `YYYYMMDD.jsonl` in the audit
//! directory. A run record is appended as a single line, so a day's file is
//! the ordered list of that day's runs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use docsync_core::domain::RunRecord;
use docsync_core::ports::IAuditSink;

const DAY_FORMAT: &str = "%Y%m%d";
const EXTENSION: &str = "jsonl";

pub struct JsonlAuditStore {
    directory: PathBuf,
}

impl JsonlAuditStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the bucket for `day`
    pub fn day_path(&self, day: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("{}.{EXTENSION}", day.format(DAY_FORMAT)))
    }

    fn parse_day(path: &Path) -> Option<NaiveDate> {
        if path.extension()? != EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        NaiveDate::parse_from_str(stem, DAY_FORMAT).ok()
    }
}

#[async_trait]
impl IAuditSink for JsonlAuditStore {
    async fn append(&self, run: &RunRecord) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .with_context(|| format!("Failed to create {}", self.directory.display()))?;

        let path = self.day_path(run.timestamp.date_naive());
        let mut line = serde_json::to_string(run).context("Failed to serialize run record")?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), links = run.links.len(), "Run record appended");
        Ok(())
    }

    async fn load_day(&self, day: NaiveDate) -> anyhow::Result<Vec<RunRecord>> {
        let path = self.day_path(day);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };

        let mut runs = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(run) => runs.push(run),
                Err(e) => warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping unreadable run record"
                ),
            }
        }
        Ok(runs)
    }

    async fn list_days(&self) -> anyhow::Result<Vec<NaiveDate>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut days = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(day) = Self::parse_day(&entry.path()) {
                days.push(day);
            }
        }
        days.sort();
        Ok(days)
    }

    async fn prune_before(&self, cutoff: NaiveDate) -> anyhow::Result<usize> {
        let mut removed = 0;
        for day in self.list_days().await? {
            if day >= cutoff {
                continue;
            }
            let path = self.day_path(day);
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed += 1;
        }
        Ok(removed)
    }
}
