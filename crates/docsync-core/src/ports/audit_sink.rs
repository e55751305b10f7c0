//! Audit sink port (driven/secondary port)
//!
//! Persists run records in an append-only, date-bucketed form: all runs
//! that started on the same calendar day land in the same record set.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::audit::RunRecord;

/// Port trait for audit persistence
#[async_trait]
pub trait IAuditSink: Send + Sync {
    /// Appends one run record to the bucket of the day it started
    async fn append(&self, run: &RunRecord) -> anyhow::Result<()>;

    /// Returns the runs recorded on `day`, oldest first
    async fn load_day(&self, day: NaiveDate) -> anyhow::Result<Vec<RunRecord>>;

    /// Days that have a bucket, oldest first
    async fn list_days(&self) -> anyhow::Result<Vec<NaiveDate>>;

    /// Deletes every bucket older than `cutoff` and returns how many were removed
    async fn prune_before(&self, cutoff: NaiveDate) -> anyhow::Result<usize>;
}
