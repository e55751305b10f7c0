//! Shared fakes and fixtures for the sync integration tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use docsync_conflict::{ConflictSession, FileConflictResolver, FileTransfer, PolicyEngine};
use docsync_core::domain::{AuditNode, Link, ProjectRef, RemoteId, RunRecord};
use docsync_core::ports::{
    DirListing, DownloadReceipt, FolderListing, IAuditSink, IConflictDecisionProvider, ILinkStore,
    ILocalSource, IRemoteSource, RemoteDocumentEntry, RemoteFolderEntry, UploadReceipt,
};
use docsync_sync::{LocalFileSystemAdapter, SyncContext, SyncEngine};

// ============================================================================
// Remote document service
// ============================================================================

struct FakeFolder {
    name: String,
    parent: Option<RemoteId>,
}

struct FakeDocument {
    name: String,
    folder: RemoteId,
    version: u64,
    content: Vec<u8>,
}

#[derive(Default)]
struct RemoteState {
    folders: HashMap<RemoteId, FakeFolder>,
    documents: HashMap<RemoteId, FakeDocument>,
    failing_listings: HashSet<RemoteId>,
    uploads: usize,
    downloads: usize,
}

/// In-memory document service with per-document version counters
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<RemoteState>,
    refuse_deletes: AtomicBool,
}

impl FakeRemote {
    pub fn add_folder(&self, parent: Option<RemoteId>, name: &str) -> RemoteId {
        let id = RemoteId::new();
        self.state.lock().unwrap().folders.insert(
            id,
            FakeFolder {
                name: name.to_string(),
                parent,
            },
        );
        id
    }

    /// Creates a document or stores a new version of it
    pub fn put_document(&self, folder: RemoteId, name: &str, content: &[u8]) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        if let Some((id, doc)) = state
            .documents
            .iter_mut()
            .find(|(_, d)| d.folder == folder && d.name == name)
        {
            doc.version += 1;
            doc.content = content.to_vec();
            return *id;
        }
        let id = RemoteId::new();
        state.documents.insert(
            id,
            FakeDocument {
                name: name.to_string(),
                folder,
                version: 1,
                content: content.to_vec(),
            },
        );
        id
    }

    /// `(version, content)` of a document
    pub fn document(&self, folder: RemoteId, name: &str) -> Option<(u64, Vec<u8>)> {
        let state = self.state.lock().unwrap();
        state
            .documents
            .values()
            .find(|d| d.folder == folder && d.name == name)
            .map(|d| (d.version, d.content.clone()))
    }

    pub fn subfolder(&self, parent: RemoteId, name: &str) -> Option<RemoteId> {
        let state = self.state.lock().unwrap();
        state
            .folders
            .iter()
            .find(|(_, f)| f.parent == Some(parent) && f.name == name)
            .map(|(id, _)| *id)
    }

    /// Removes a folder with everything below it, as if deleted on the service
    pub fn remove_folder(&self, id: RemoteId) {
        let mut state = self.state.lock().unwrap();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            state.folders.remove(&current);
            state.documents.retain(|_, d| d.folder != current);
            pending.extend(
                state
                    .folders
                    .iter()
                    .filter(|(_, f)| f.parent == Some(current))
                    .map(|(id, _)| *id),
            );
        }
    }

    pub fn remove_document(&self, folder: RemoteId, name: &str) {
        self.state
            .lock()
            .unwrap()
            .documents
            .retain(|_, d| !(d.folder == folder && d.name == name));
    }

    pub fn fail_listing(&self, id: RemoteId) {
        self.state.lock().unwrap().failing_listings.insert(id);
    }

    pub fn refuse_deletes(&self, refuse: bool) {
        self.refuse_deletes.store(refuse, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> usize {
        self.state.lock().unwrap().uploads
    }

    pub fn downloads(&self) -> usize {
        self.state.lock().unwrap().downloads
    }
}

#[async_trait]
impl IRemoteSource for FakeRemote {
    async fn list_folder(&self, id: &RemoteId) -> anyhow::Result<FolderListing> {
        let state = self.state.lock().unwrap();
        if state.failing_listings.contains(id) {
            anyhow::bail!("service unavailable");
        }
        if !state.folders.contains_key(id) {
            anyhow::bail!("no folder {id}");
        }

        let mut listing = FolderListing::default();
        for (child_id, folder) in &state.folders {
            if folder.parent == Some(*id) {
                listing.folders.push(RemoteFolderEntry {
                    id: *child_id,
                    name: folder.name.clone(),
                });
            }
        }
        for (doc_id, doc) in &state.documents {
            if doc.folder == *id {
                listing.documents.push(RemoteDocumentEntry {
                    id: *doc_id,
                    name: doc.name.clone(),
                    version: doc.version,
                    modified_at: None,
                });
            }
        }
        listing.folders.sort_by(|a, b| a.name.cmp(&b.name));
        listing.documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn create_folder(&self, parent: &RemoteId, name: &str) -> anyhow::Result<RemoteId> {
        if let Some(existing) = self.subfolder(*parent, name) {
            return Ok(existing);
        }
        Ok(self.add_folder(Some(*parent), name))
    }

    async fn upload_document(&self, path: &Path, folder: &RemoteId) -> anyhow::Result<UploadReceipt> {
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("no file name in {}", path.display()))?;

        let existing = self.document(*folder, &name);
        let id = match existing {
            Some((_, old)) if old == content => self
                .document_id(*folder, &name)
                .ok_or_else(|| anyhow::anyhow!("document vanished"))?,
            _ => self.put_document(*folder, &name, &content),
        };
        let (version, _) = self
            .document(*folder, &name)
            .ok_or_else(|| anyhow::anyhow!("document vanished"))?;

        self.state.lock().unwrap().uploads += 1;
        Ok(UploadReceipt {
            id,
            version,
            modified_at: Some(Utc::now()),
        })
    }

    async fn download_document(&self, id: &RemoteId, dest: &Path) -> anyhow::Result<DownloadReceipt> {
        let content = {
            let state = self.state.lock().unwrap();
            state
                .documents
                .get(id)
                .map(|d| d.content.clone())
                .ok_or_else(|| anyhow::anyhow!("no document {id}"))?
        };
        std::fs::write(dest, content)?;
        let modified: DateTime<Utc> = std::fs::metadata(dest)?.modified()?.into();

        self.state.lock().unwrap().downloads += 1;
        Ok(DownloadReceipt {
            modified_at: modified,
        })
    }

    async fn delete_document(&self, id: &RemoteId) -> anyhow::Result<bool> {
        if self.refuse_deletes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.state.lock().unwrap().documents.remove(id).is_some())
    }

    async fn delete_folder(&self, id: &RemoteId) -> anyhow::Result<bool> {
        if self.refuse_deletes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.state.lock().unwrap().folders.remove(id).is_some())
    }
}

impl FakeRemote {
    fn document_id(&self, folder: RemoteId, name: &str) -> Option<RemoteId> {
        let state = self.state.lock().unwrap();
        state
            .documents
            .iter()
            .find(|(_, d)| d.folder == folder && d.name == name)
            .map(|(id, _)| *id)
    }
}

// ============================================================================
// Local filesystem with injectable listing failures
// ============================================================================

#[derive(Default)]
pub struct FlakyLocal {
    inner: LocalFileSystemAdapter,
    failing: Mutex<HashSet<PathBuf>>,
}

impl FlakyLocal {
    pub fn fail_listing(&self, path: impl Into<PathBuf>) {
        self.failing.lock().unwrap().insert(path.into());
    }
}

#[async_trait]
impl ILocalSource for FlakyLocal {
    async fn list_children(&self, path: &Path) -> anyhow::Result<DirListing> {
        if self.failing.lock().unwrap().contains(path) {
            anyhow::bail!("permission denied: {}", path.display());
        }
        self.inner.list_children(path).await
    }

    async fn create_dir(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.create_dir(path).await
    }

    async fn create_file(&self, path: &Path, bytes: &[u8]) -> anyhow::Result<DateTime<Utc>> {
        self.inner.create_file(path, bytes).await
    }

    async fn delete_file(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.delete_file(path).await
    }

    async fn delete_dir(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.delete_dir(path).await
    }
}

// ============================================================================
// Link store and audit sink
// ============================================================================

#[derive(Default)]
pub struct MemoryLinkStore {
    links: Mutex<BTreeMap<String, Link>>,
    saves: AtomicU64,
}

impl MemoryLinkStore {
    pub fn insert(&self, link: Link) {
        self.links
            .lock()
            .unwrap()
            .insert(link.name().to_string(), link);
    }

    pub fn get(&self, name: &str) -> Option<Link> {
        self.links.lock().unwrap().get(name).cloned()
    }

    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ILinkStore for MemoryLinkStore {
    async fn load_links(&self) -> anyhow::Result<Vec<Link>> {
        Ok(self.links.lock().unwrap().values().cloned().collect())
    }

    async fn get_link(&self, name: &str) -> anyhow::Result<Option<Link>> {
        Ok(self.get(name))
    }

    async fn save_link(&self, link: &Link) -> anyhow::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.insert(link.clone());
        Ok(())
    }

    async fn remove_link(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.links.lock().unwrap().remove(name).is_some())
    }
}

#[derive(Default)]
pub struct MemoryAuditSink {
    runs: Mutex<Vec<RunRecord>>,
}

impl MemoryAuditSink {
    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl IAuditSink for MemoryAuditSink {
    async fn append(&self, run: &RunRecord) -> anyhow::Result<()> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn load_day(&self, day: NaiveDate) -> anyhow::Result<Vec<RunRecord>> {
        Ok(self
            .runs()
            .into_iter()
            .filter(|r| r.timestamp.date_naive() == day)
            .collect())
    }

    async fn list_days(&self) -> anyhow::Result<Vec<NaiveDate>> {
        let mut days: Vec<NaiveDate> = self.runs().iter().map(|r| r.timestamp.date_naive()).collect();
        days.dedup();
        Ok(days)
    }

    async fn prune_before(&self, cutoff: NaiveDate) -> anyhow::Result<usize> {
        let mut runs = self.runs.lock().unwrap();
        let before = runs.len();
        runs.retain(|r| r.timestamp.date_naive() >= cutoff);
        Ok(before - runs.len())
    }
}

// ============================================================================
// Conflict decisions
// ============================================================================

/// Always answers with the same decision and counts how often it was asked
pub struct CountingProvider {
    pub decision: docsync_core::ports::ConflictDecision,
    pub asked: Mutex<Vec<String>>,
}

impl CountingProvider {
    pub fn new(decision: docsync_core::ports::ConflictDecision) -> Self {
        Self {
            decision,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl IConflictDecisionProvider for CountingProvider {
    async fn ask(
        &self,
        path: &str,
        _local: &docsync_core::domain::LocalFile,
        _remote: &docsync_core::domain::RemoteFile,
    ) -> anyhow::Result<docsync_core::ports::ConflictDecision> {
        self.asked.lock().unwrap().push(path.to_string());
        Ok(self.decision)
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub const FORBIDDEN: &[&str] = &["exe"];

/// A temp directory, the fakes around it and one link per `add_link`
pub struct Fixture {
    pub dir: TempDir,
    pub remote: Arc<FakeRemote>,
    pub local: Arc<FlakyLocal>,
    clock: AtomicU64,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            remote: Arc::new(FakeRemote::default()),
            local: Arc::new(FlakyLocal::default()),
            clock: AtomicU64::new(0),
        }
    }

    /// Creates `<tmp>/<name>` and a remote root folder, and links them
    pub fn add_link(&self, name: &str) -> Link {
        let local_root = self.dir.path().join(name);
        std::fs::create_dir_all(&local_root).unwrap();
        let remote_root = self.remote.add_folder(None, name);
        let project = ProjectRef {
            id: 1,
            uuid: Uuid::new_v4(),
            name: format!("{name}-project"),
        };
        Link::new(name, local_root, remote_root, project).unwrap()
    }

    pub fn local_path(&self, link: &Link, rel: &str) -> PathBuf {
        link.local_root().join(rel)
    }

    /// Writes a local file with a modification time later than any before it
    pub fn write_local(&self, link: &Link, rel: &str, content: &str) {
        let path = self.local_path(link, rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();

        let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let mtime = SystemTime::now() + Duration::from_secs(10 * tick);
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    pub fn read_local(&self, link: &Link, rel: &str) -> Option<String> {
        std::fs::read_to_string(self.local_path(link, rel)).ok()
    }

    pub fn engine(&self) -> SyncEngine {
        let transfer = FileTransfer::new(
            self.remote.clone(),
            FORBIDDEN.iter().map(|s| s.to_string()).collect(),
        );
        SyncEngine::new(
            self.local.clone(),
            self.remote.clone(),
            FileConflictResolver::new(transfer),
        )
    }

    pub async fn sync(&self, link: &mut Link, policy: &str, delete_physically: bool) -> AuditNode {
        let session = ConflictSession::new(Arc::new(PolicyEngine::new(policy, &[])), None);
        let mut ctx = SyncContext::new(session, delete_physically);
        self.engine().sync_link(link, &mut ctx).await.unwrap()
    }
}

/// `(local, remote)` status pair of the entry at `path`
pub fn outcome(
    entry: &AuditNode,
    path: &str,
) -> (docsync_core::domain::SyncStatus, docsync_core::domain::SyncStatus) {
    let node = entry
        .find(path)
        .unwrap_or_else(|| panic!("no audit entry for '{path}'"));
    (node.local, node.remote)
}
