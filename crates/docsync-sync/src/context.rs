//! Per-link sync context
//!
//! Created fresh for every link-level sync call and passed down the
//! reconciliation walk. Nothing in it outlives the call: the remembered
//! conflict choice, the deletion switch and the folders whose refresh failed.

use std::collections::BTreeSet;

use docsync_conflict::ConflictSession;
use docsync_core::domain::Side;

use crate::refresh::RefreshReport;

pub struct SyncContext {
    session: ConflictSession,
    delete_physically: bool,
    local_failures: BTreeSet<String>,
    remote_failures: BTreeSet<String>,
}

impl SyncContext {
    pub fn new(session: ConflictSession, delete_physically: bool) -> Self {
        Self {
            session,
            delete_physically,
            local_failures: BTreeSet::new(),
            remote_failures: BTreeSet::new(),
        }
    }

    pub fn session_mut(&mut self) -> &mut ConflictSession {
        &mut self.session
    }

    pub fn delete_physically(&self) -> bool {
        self.delete_physically
    }

    /// Records the folders (relative paths) whose listing failed on `side`
    pub fn record_refresh(&mut self, side: Side, report: &RefreshReport) {
        let failures = match side {
            Side::Local => &mut self.local_failures,
            Side::Remote => &mut self.remote_failures,
        };
        failures.extend(report.failed.iter().cloned());
    }

    /// Whether the folder at `rel` failed to refresh, per side
    pub fn refresh_failed(&self, rel: &str) -> (bool, bool) {
        (
            self.local_failures.contains(rel),
            self.remote_failures.contains(rel),
        )
    }
}
