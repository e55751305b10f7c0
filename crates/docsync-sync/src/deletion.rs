//! Deletion policy
//!
//! When one replica of a node is gone, its counterpart on the other side is
//! either disabled (soft) or physically deleted (hard), depending on the
//! `delete_physically` switch.
//!
//! | Mode | Outcome on the counterpart side | Node kept |
//! |------|---------------------------------|-----------|
//! | soft | `Removed`, selection set to Exclude | yes |
//! | hard, success | `Deleted` | no |
//! | hard, failure | `Error`, selection set to Exclude | yes |
//!
//! The side whose node vanished is always reported as `NotExisting`.
//! Folders are deleted bottom-up so every descendant gets its own entry.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use docsync_core::domain::{
    AuditNode, File, Folder, Local, NodeKind, ReasonCode, Remote, Replica, Selection, Side,
    SyncStatus,
};
use docsync_core::ports::{ILocalSource, IRemoteSource};

use crate::SyncError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Physically removes nodes of one replica
#[async_trait]
pub trait Eraser<R: Replica>: Send + Sync {
    /// `Ok(false)` means the source refused the delete
    async fn erase_file(&self, file: &File<R>) -> anyhow::Result<bool>;

    /// Removes a folder whose children were already erased
    async fn erase_folder(&self, folder: &Folder<R>) -> anyhow::Result<bool>;
}

pub struct LocalEraser(pub Arc<dyn ILocalSource>);

#[async_trait]
impl Eraser<Local> for LocalEraser {
    async fn erase_file(&self, file: &File<Local>) -> anyhow::Result<bool> {
        self.0.delete_file(&file.state().path).await?;
        Ok(true)
    }

    async fn erase_folder(&self, folder: &Folder<Local>) -> anyhow::Result<bool> {
        self.0.delete_dir(folder.key()).await?;
        Ok(true)
    }
}

pub struct RemoteEraser(pub Arc<dyn IRemoteSource>);

#[async_trait]
impl Eraser<Remote> for RemoteEraser {
    async fn erase_file(&self, file: &File<Remote>) -> anyhow::Result<bool> {
        self.0.delete_document(&file.state().id).await
    }

    async fn erase_folder(&self, folder: &Folder<Remote>) -> anyhow::Result<bool> {
        self.0.delete_folder(folder.key()).await
    }
}

/// Whether the caller should detach the counterpart from its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Detach,
}

/// Audit entry with `status` on replica `R`'s side and `NotExisting` on the other
fn counterpart_entry<R: Replica>(name: &str, kind: NodeKind, status: SyncStatus) -> AuditNode {
    match R::SIDE {
        Side::Local => AuditNode::new(name, kind, status, SyncStatus::NotExisting),
        Side::Remote => AuditNode::new(name, kind, SyncStatus::NotExisting, status),
    }
}

fn confirm(result: anyhow::Result<bool>, what: &str) -> Result<(), SyncError> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(SyncError::PhysicalDelete(format!("{what}: refused"))),
        Err(e) => Err(SyncError::PhysicalDelete(format!("{what}: {e}"))),
    }
}

/// Deletes the counterpart file of a vanished node
pub async fn delete_file<R: Replica>(
    eraser: &dyn Eraser<R>,
    physical: bool,
    file: &mut File<R>,
) -> (AuditNode, Disposition) {
    let name = file.name().to_string();
    if !physical {
        file.set_selection(Selection::Exclude);
        info!(side = %R::SIDE, file = %name, "Counterpart disabled");
        return (
            counterpart_entry::<R>(&name, NodeKind::File, SyncStatus::Removed),
            Disposition::Keep,
        );
    }

    match confirm(eraser.erase_file(file).await, &name) {
        Ok(()) => {
            info!(side = %R::SIDE, file = %name, "Counterpart deleted");
            (
                counterpart_entry::<R>(&name, NodeKind::File, SyncStatus::Deleted),
                Disposition::Detach,
            )
        }
        Err(e) => {
            warn!(side = %R::SIDE, error = %e, "Falling back to disabling counterpart");
            file.set_selection(Selection::Exclude);
            let entry = counterpart_entry::<R>(&name, NodeKind::File, SyncStatus::Error)
                .with_reason(ReasonCode::PhysicalDeleteFailure);
            (entry, Disposition::Keep)
        }
    }
}

/// Deletes the counterpart folder of a vanished node, descendants first
pub fn delete_folder<'a, R: Replica>(
    eraser: &'a dyn Eraser<R>,
    physical: bool,
    folder: &'a mut Folder<R>,
) -> BoxFuture<'a, (AuditNode, Disposition)> {
    Box::pin(async move {
        let name = folder.name().to_string();
        if !physical {
            folder.set_all(Selection::Exclude);
            info!(side = %R::SIDE, folder = %name, "Counterpart subtree disabled");
            return (removed_entries(folder), Disposition::Keep);
        }

        let mut entry = counterpart_entry::<R>(&name, NodeKind::Folder, SyncStatus::Deleted);

        for file_name in folder.file_names() {
            let Some(file) = folder.file_mut(&file_name) else {
                continue;
            };
            let (child, disposition) = delete_file(eraser, true, file).await;
            if disposition == Disposition::Detach {
                folder.detach_file(&file_name);
            }
            entry.push(child);
        }
        for folder_name in folder.folder_names() {
            let Some(sub) = folder.folder_mut(&folder_name) else {
                continue;
            };
            let (child, disposition) = delete_folder(eraser, true, sub).await;
            if disposition == Disposition::Detach {
                folder.detach_folder(&folder_name);
            }
            entry.push(child);
        }

        match confirm(eraser.erase_folder(folder).await, &name) {
            Ok(()) => {
                info!(side = %R::SIDE, folder = %name, "Counterpart folder deleted");
                (entry, Disposition::Detach)
            }
            Err(e) => {
                warn!(side = %R::SIDE, error = %e, "Falling back to disabling counterpart folder");
                folder.set_all(Selection::Exclude);
                let (local, remote) = match R::SIDE {
                    Side::Local => (SyncStatus::Error, SyncStatus::NotExisting),
                    Side::Remote => (SyncStatus::NotExisting, SyncStatus::Error),
                };
                entry.set_outcome(local, remote);
                (entry.with_reason(ReasonCode::PhysicalDeleteFailure), Disposition::Keep)
            }
        }
    })
}

/// `Removed` entries for a disabled subtree
fn removed_entries<R: Replica>(folder: &Folder<R>) -> AuditNode {
    let mut entry = counterpart_entry::<R>(folder.name(), NodeKind::Folder, SyncStatus::Removed);
    for file in folder.files() {
        entry.push(counterpart_entry::<R>(file.name(), NodeKind::File, SyncStatus::Removed));
    }
    for sub in folder.folders() {
        entry.push(removed_entries(sub));
    }
    entry
}
