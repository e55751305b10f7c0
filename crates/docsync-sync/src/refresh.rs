//! Tree refresh
//!
//! Brings both trees of a link up to date with their sources before the
//! reconciliation walk. Each folder is listed once; the listing is applied
//! to the folder's children and the walk continues into eligible,
//! non-tombstoned subfolders.
//!
//! Applying a listing:
//! - known subfolders missing from it are tombstoned, present ones are cleared
//! - known files missing from it lose their observed state (mtime or version)
//! - new entries are attached with the selection inherited from the folder
//!
//! A failed listing is logged and recorded in the [`RefreshReport`]; the
//! folder's stored children are left untouched.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use docsync_core::domain::{
    LocalFile, LocalFileState, LocalFolder, RemoteFile, RemoteFileState, RemoteFolder,
};
use docsync_core::ports::{DirListing, FolderListing, ILocalSource, IRemoteSource};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of refreshing one tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Relative paths of folders whose listing failed (`""` is the root)
    pub failed: BTreeSet<String>,
    /// Number of folders listed successfully
    pub listed: usize,
}

impl RefreshReport {
    pub fn root_failed(&self) -> bool {
        self.failed.contains("")
    }
}

/// Joins a relative path and a child name with `/`
pub fn join_rel(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{rel}/{name}")
    }
}

// ============================================================================
// Local
// ============================================================================

pub async fn refresh_local(source: &dyn ILocalSource, root: &mut LocalFolder) -> RefreshReport {
    let mut report = RefreshReport::default();
    refresh_local_folder(source, root, String::new(), &mut report).await;
    debug!(listed = report.listed, failed = report.failed.len(), "Local tree refreshed");
    report
}

fn refresh_local_folder<'a>(
    source: &'a dyn ILocalSource,
    folder: &'a mut LocalFolder,
    rel: String,
    report: &'a mut RefreshReport,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let listing = match source.list_children(folder.key()).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(path = %folder.key().display(), error = %e, "Local listing failed");
                report.failed.insert(rel);
                return;
            }
        };
        report.listed += 1;
        apply_local_listing(folder, &listing);

        for child in folder.folders_mut() {
            if child.is_to_sync() && !child.is_tombstoned() {
                let child_rel = join_rel(&rel, child.name());
                refresh_local_folder(source, child, child_rel, &mut *report).await;
            }
        }
    })
}

/// Applies a directory listing to the immediate children of `folder`
pub fn apply_local_listing(folder: &mut LocalFolder, listing: &DirListing) {
    let inherited = folder.selection().inherited();
    let base = folder.key().clone();

    for child in folder.folders_mut() {
        let present = listing.folders.iter().any(|n| n == child.name());
        child.set_tombstoned(!present);
        if present {
            let path = base.join(child.name());
            child.set_key(path);
        }
    }
    for name in &listing.folders {
        if folder.folder(name).is_none() {
            folder.attach_folder(LocalFolder::new(name.clone(), base.join(name), inherited));
        }
    }

    for file in folder.files_mut() {
        let path = base.join(file.name());
        let entry = listing.files.iter().find(|e| e.name == file.name());
        let state = file.state_mut();
        match entry {
            Some(entry) => {
                state.observed_at = Some(entry.modified);
                state.path = path;
            }
            None => state.observed_at = None,
        }
    }
    for entry in &listing.files {
        if folder.file(&entry.name).is_none() {
            let state = LocalFileState::observed(base.join(&entry.name), entry.modified);
            folder.attach_file(LocalFile::new(entry.name.clone(), inherited, state));
        }
    }
}

// ============================================================================
// Remote
// ============================================================================

pub async fn refresh_remote(source: &dyn IRemoteSource, root: &mut RemoteFolder) -> RefreshReport {
    let mut report = RefreshReport::default();
    refresh_remote_folder(source, root, String::new(), &mut report).await;
    debug!(listed = report.listed, failed = report.failed.len(), "Remote tree refreshed");
    report
}

fn refresh_remote_folder<'a>(
    source: &'a dyn IRemoteSource,
    folder: &'a mut RemoteFolder,
    rel: String,
    report: &'a mut RefreshReport,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let listing = match source.list_folder(folder.key()).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(id = %folder.key(), folder = %rel, error = %e, "Remote listing failed");
                report.failed.insert(rel);
                return;
            }
        };
        report.listed += 1;
        apply_remote_listing(folder, &listing);

        for child in folder.folders_mut() {
            if child.is_to_sync() && !child.is_tombstoned() {
                let child_rel = join_rel(&rel, child.name());
                refresh_remote_folder(source, child, child_rel, &mut *report).await;
            }
        }
    })
}

/// Applies a remote folder listing to the immediate children of `folder`
pub fn apply_remote_listing(folder: &mut RemoteFolder, listing: &FolderListing) {
    let inherited = folder.selection().inherited();

    for child in folder.folders_mut() {
        match listing.folders.iter().find(|e| e.name == child.name()) {
            Some(entry) => {
                child.set_tombstoned(false);
                child.set_key(entry.id);
            }
            None => child.set_tombstoned(true),
        }
    }
    for entry in &listing.folders {
        if folder.folder(&entry.name).is_none() {
            folder.attach_folder(RemoteFolder::new(entry.name.clone(), entry.id, inherited));
        }
    }

    for file in folder.files_mut() {
        let entry = listing.documents.iter().find(|e| e.name == file.name());
        let state = file.state_mut();
        match entry {
            Some(entry) => {
                state.id = entry.id;
                state.version = Some(entry.version);
                state.modified_at = entry.modified_at;
            }
            None => state.version = None,
        }
    }
    for entry in &listing.documents {
        if folder.file(&entry.name).is_none() {
            let state = RemoteFileState::listed(entry.id, entry.version, entry.modified_at);
            folder.attach_file(RemoteFile::new(entry.name.clone(), inherited, state));
        }
    }
}
