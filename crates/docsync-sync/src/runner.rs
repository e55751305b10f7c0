//! Link runner - one sequential pass over every active link
//!
//! For each link the runner builds a fresh [`SyncContext`] (so a remembered
//! conflict choice never leaks into the next link), syncs it, and writes the
//! link back to the store whether or not the sync succeeded. The resulting
//! [`RunRecord`] is handed to the audit recorder, and old audit buckets are
//! pruned afterwards.
//!
//! Cancellation is only honoured between links.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use docsync_audit::AuditRecorder;
use docsync_conflict::{ConflictSession, PolicyEngine};
use docsync_core::config::Config;
use docsync_core::domain::{Link, LinkRecord, RunRecord};
use docsync_core::ports::{IConflictDecisionProvider, ILinkStore};

use crate::context::SyncContext;
use crate::engine::SyncEngine;
use crate::SyncError;

/// Progress callback: `(index, total, link name)`, called before each link
pub type ProgressFn = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

pub struct LinkRunner {
    engine: SyncEngine,
    store: Arc<dyn ILinkStore>,
    recorder: AuditRecorder,
    policy: Arc<PolicyEngine>,
    provider: Option<Arc<dyn IConflictDecisionProvider>>,
    delete_physically: bool,
    retention_days: u32,
    progress: Option<ProgressFn>,
}

impl LinkRunner {
    pub fn new(
        engine: SyncEngine,
        store: Arc<dyn ILinkStore>,
        recorder: AuditRecorder,
        policy: Arc<PolicyEngine>,
    ) -> Self {
        Self {
            engine,
            store,
            recorder,
            policy,
            provider: None,
            delete_physically: false,
            retention_days: 0,
            progress: None,
        }
    }

    /// Builds a runner from the loaded configuration
    ///
    /// The conflict policy and rules come from `sync.conflict_policy` and
    /// `sync.conflict_rules`, the deletion policy from `sync.delete_physically`
    /// and the audit window from `audit.retention_days`.
    pub fn from_config(
        engine: SyncEngine,
        store: Arc<dyn ILinkStore>,
        recorder: AuditRecorder,
        config: &Config,
    ) -> Self {
        Self::new(
            engine,
            store,
            recorder,
            Arc::new(PolicyEngine::from_config(&config.sync)),
        )
        .with_delete_physically(config.sync.delete_physically)
        .with_retention_days(config.audit.retention_days)
    }

    pub fn with_provider(mut self, provider: Arc<dyn IConflictDecisionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_delete_physically(mut self, delete_physically: bool) -> Self {
        self.delete_physically = delete_physically;
        self
    }

    /// Audit buckets older than this many days are pruned after a run; 0 keeps all
    pub fn with_retention_days(mut self, retention_days: u32) -> Self {
        self.retention_days = retention_days;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Syncs every active link once, in name order
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` when the links cannot be loaded. Failures of
    /// individual links end up in their `LinkRecord` instead.
    #[instrument(skip(self, cancel))]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunRecord, SyncError> {
        let links = self
            .store
            .load_links()
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;
        let mut active: Vec<Link> = links.into_iter().filter(Link::is_active).collect();
        let total = active.len();
        info!(links = total, "Starting run");

        let mut run = RunRecord::new();
        for (index, link) in active.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                info!(completed = index, total, "Run cancelled between links");
                break;
            }
            if let Some(progress) = &self.progress {
                progress(index, total, link.name());
            }

            let record = self.run_link(link).await;
            if let Err(e) = self.store.save_link(link).await {
                warn!(link = %link.name(), error = %e, "Failed to save link after sync");
            }
            run.push(record);
        }

        info!(summary = %run.summary(), "Run finished");
        self.recorder.record(&run).await;
        self.recorder.prune_now(self.retention_days).await;
        Ok(run)
    }

    /// Syncs one link with a fresh per-link context
    ///
    /// Never fails: a link-level error becomes a single `Error/Error` record.
    pub async fn run_link(&self, link: &mut Link) -> LinkRecord {
        let session = ConflictSession::new(self.policy.clone(), self.provider.clone());
        let mut ctx = SyncContext::new(session, self.delete_physically);
        let name = link.name().to_string();
        let local_root = link.local_root().clone();
        let remote_root = link.remote_root_id();

        match self.engine.sync_link(link, &mut ctx).await {
            Ok(root) => LinkRecord {
                link: name,
                local_root,
                remote_root,
                timestamp: Utc::now(),
                root,
            },
            Err(e) => {
                error!(link = %name, error = %e, "Link sync failed");
                let mut record = LinkRecord::failed(name, local_root, remote_root);
                record.root.reason = Some(e.reason());
                record
            }
        }
    }
}
