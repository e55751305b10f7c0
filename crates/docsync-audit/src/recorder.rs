//! AuditRecorder - non-fatal audit persistence
//!
//! Wraps an [`IAuditSink`]. Recording and pruning never fail the caller:
//! errors are logged via `tracing::warn!` and swallowed, so a broken audit
//! directory never aborts a sync run.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, warn};

use docsync_core::domain::RunRecord;
use docsync_core::ports::IAuditSink;

pub struct AuditRecorder {
    sink: Arc<dyn IAuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn IAuditSink>) -> Self {
        Self { sink }
    }

    /// Appends a run record, swallowing errors with a tracing warning
    pub async fn record(&self, run: &RunRecord) {
        match self.sink.append(run).await {
            Ok(()) => info!(
                links = run.links.len(),
                summary = %run.summary(),
                "Run recorded"
            ),
            Err(e) => warn!(error = %e, "Failed to record run"),
        }
    }

    /// Deletes buckets older than `retention_days` before `today`
    ///
    /// A retention of 0 keeps everything. Returns the number of removed buckets.
    pub async fn prune(&self, retention_days: u32, today: NaiveDate) -> usize {
        if retention_days == 0 {
            return 0;
        }
        let Some(cutoff) = today.checked_sub_days(Days::new(u64::from(retention_days))) else {
            return 0;
        };
        match self.sink.prune_before(cutoff).await {
            Ok(removed) => {
                if removed > 0 {
                    info!(removed, %cutoff, "Pruned audit buckets");
                }
                removed
            }
            Err(e) => {
                warn!(error = %e, "Failed to prune audit buckets");
                0
            }
        }
    }

    /// `prune` relative to the current UTC day
    pub async fn prune_now(&self, retention_days: u32) -> usize {
        self.prune(retention_days, Utc::now().date_naive()).await
    }
}
