//! Tree node model
//!
//! Two parallel trees are kept per link: one mirrors the local directory,
//! the other mirrors the remote project folder. Both share the same shape
//! (`Folder` and `File` nodes with a tri-state selection) and differ only in
//! how a node is identified and how file changes are tracked. That difference
//! is captured by the [`Replica`] marker trait:
//!
//! | Replica  | Folder key  | File state         |
//! |----------|-------------|--------------------|
//! | `Local`  | `PathBuf`   | [`LocalFileState`]  (mtime based)   |
//! | `Remote` | `RemoteId`  | [`RemoteFileState`] (version based) |
//!
//! Children are owned by their parent folder. There is no parent
//! back-reference: callers that need the ancestor chain carry it while
//! walking. Names are unique per kind within one folder, so a folder and a
//! file may share a name.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::change::TrackedState;
use super::newtypes::RemoteId;
use super::selection::Selection;

// ============================================================================
// Replica markers
// ============================================================================

/// Which side of a link a tree mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Local,
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => write!(f, "local"),
            Side::Remote => write!(f, "remote"),
        }
    }
}

/// Capability trait binding a tree to its identifier and change-tracking types
pub trait Replica: fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    /// Identifier stored on folders of this replica
    type FolderKey: fmt::Debug + Clone + PartialEq + Send + Sync + Serialize + DeserializeOwned;
    /// Per-file bookkeeping used by change detection
    type FileState: TrackedState
        + fmt::Debug
        + Clone
        + PartialEq
        + Send
        + Sync
        + Serialize
        + DeserializeOwned;

    const SIDE: Side;
}

/// Marker for the local filesystem replica
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Local;

/// Marker for the remote document service replica
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remote;

impl Replica for Local {
    type FolderKey = PathBuf;
    type FileState = LocalFileState;
    const SIDE: Side = Side::Local;
}

impl Replica for Remote {
    type FolderKey = RemoteId;
    type FileState = RemoteFileState;
    const SIDE: Side = Side::Remote;
}

pub type LocalFolder = Folder<Local>;
pub type LocalFile = File<Local>;
pub type LocalNode = Node<Local>;
pub type RemoteFolder = Folder<Remote>;
pub type RemoteFile = File<Remote>;
pub type RemoteNode = Node<Remote>;

// ============================================================================
// File state per replica
// ============================================================================

/// Change-tracking state of a local file
///
/// `observed_at` is the modification time seen in the latest refresh, or
/// `None` when the file was missing from the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileState {
    pub path: PathBuf,
    pub observed_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl LocalFileState {
    /// State for a file seen for the first time at `path` with mtime `observed_at`
    pub fn observed(path: impl Into<PathBuf>, observed_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            observed_at: Some(observed_at),
            last_synced_at: None,
        }
    }
}

/// Change-tracking state of a remote document
///
/// `version` is `None` when the document was absent from the latest listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileState {
    pub id: RemoteId,
    pub version: Option<u64>,
    pub last_synced_version: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl RemoteFileState {
    /// State for a document listed for the first time
    pub fn listed(id: RemoteId, version: u64, modified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id,
            version: Some(version),
            last_synced_version: None,
            modified_at,
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A file leaf in one replica's tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct File<R: Replica> {
    name: String,
    selection: Selection,
    #[serde(default)]
    depth: u32,
    state: R::FileState,
}

impl<R: Replica> File<R> {
    /// Creates a file node. Files are never `Partial`; that value is stored as `Include`.
    pub fn new(name: impl Into<String>, selection: Selection, state: R::FileState) -> Self {
        Self {
            name: name.into(),
            selection: selection.for_leaf(),
            depth: 0,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.for_leaf();
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn state(&self) -> &R::FileState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut R::FileState {
        &mut self.state
    }
}

/// A folder in one replica's tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Folder<R: Replica> {
    name: String,
    selection: Selection,
    #[serde(default)]
    depth: u32,
    #[serde(default)]
    tombstoned: bool,
    key: R::FolderKey,
    #[serde(default)]
    children: Vec<Node<R>>,
}

/// A child of a folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "", tag = "kind", rename_all = "snake_case")]
pub enum Node<R: Replica> {
    Folder(Folder<R>),
    File(File<R>),
}

impl<R: Replica> Node<R> {
    pub fn name(&self) -> &str {
        match self {
            Node::Folder(folder) => folder.name(),
            Node::File(file) => file.name(),
        }
    }

    pub fn selection(&self) -> Selection {
        match self {
            Node::Folder(folder) => folder.selection(),
            Node::File(file) => file.selection(),
        }
    }

    pub fn depth(&self) -> u32 {
        match self {
            Node::Folder(folder) => folder.depth(),
            Node::File(file) => file.depth(),
        }
    }

    /// Sets the selection on this node and, for folders, on every descendant
    pub fn set_all(&mut self, selection: Selection) {
        match self {
            Node::Folder(folder) => folder.set_all(selection),
            Node::File(file) => file.set_selection(selection),
        }
    }

    fn set_depth(&mut self, depth: u32) {
        match self {
            Node::Folder(folder) => folder.set_depth(depth),
            Node::File(file) => file.depth = depth,
        }
    }
}

impl<R: Replica> Folder<R> {
    /// Creates a detached folder at depth 0
    pub fn new(name: impl Into<String>, key: R::FolderKey, selection: Selection) -> Self {
        Self {
            name: name.into(),
            selection,
            depth: 0,
            tombstoned: false,
            key,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Sets this folder's own selection without touching descendants
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_tombstoned(&self) -> bool {
        self.tombstoned
    }

    pub fn set_tombstoned(&mut self, tombstoned: bool) {
        self.tombstoned = tombstoned;
    }

    pub fn key(&self) -> &R::FolderKey {
        &self.key
    }

    pub fn set_key(&mut self, key: R::FolderKey) {
        self.key = key;
    }

    pub fn children(&self) -> &[Node<R>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Node<R>] {
        &mut self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Sets the selection on this folder and cascades it to every descendant
    pub fn set_all(&mut self, selection: Selection) {
        self.selection = selection;
        for child in &mut self.children {
            child.set_all(selection);
        }
    }

    fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
        for child in &mut self.children {
            child.set_depth(depth + 1);
        }
    }

    // ------------------------------------------------------------------------
    // Per-kind child access
    // ------------------------------------------------------------------------

    pub fn folders(&self) -> impl Iterator<Item = &Folder<R>> {
        self.children.iter().filter_map(|child| match child {
            Node::Folder(folder) => Some(folder),
            Node::File(_) => None,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &File<R>> {
        self.children.iter().filter_map(|child| match child {
            Node::File(file) => Some(file),
            Node::Folder(_) => None,
        })
    }

    pub fn folders_mut(&mut self) -> impl Iterator<Item = &mut Folder<R>> {
        self.children.iter_mut().filter_map(|child| match child {
            Node::Folder(folder) => Some(folder),
            Node::File(_) => None,
        })
    }

    pub fn files_mut(&mut self) -> impl Iterator<Item = &mut File<R>> {
        self.children.iter_mut().filter_map(|child| match child {
            Node::File(file) => Some(file),
            Node::Folder(_) => None,
        })
    }

    /// Names of the child folders, in child order
    pub fn folder_names(&self) -> Vec<String> {
        self.folders().map(|f| f.name.clone()).collect()
    }

    /// Names of the child files, in child order
    pub fn file_names(&self) -> Vec<String> {
        self.files().map(|f| f.name.clone()).collect()
    }

    pub fn folder(&self, name: &str) -> Option<&Folder<R>> {
        self.folders().find(|f| f.name == name)
    }

    pub fn folder_mut(&mut self, name: &str) -> Option<&mut Folder<R>> {
        self.folders_mut().find(|f| f.name == name)
    }

    pub fn file(&self, name: &str) -> Option<&File<R>> {
        self.files().find(|f| f.name == name)
    }

    pub fn file_mut(&mut self, name: &str) -> Option<&mut File<R>> {
        self.files_mut().find(|f| f.name == name)
    }

    /// Attaches `folder` as a child, replacing any folder of the same name
    pub fn attach_folder(&mut self, mut folder: Folder<R>) -> &mut Folder<R> {
        self.detach_folder(&folder.name);
        folder.set_depth(self.depth + 1);
        self.children.push(Node::Folder(folder));
        match self.children.last_mut() {
            Some(Node::Folder(folder)) => folder,
            _ => unreachable!("a folder was pushed last"),
        }
    }

    /// Attaches `file` as a child, replacing any file of the same name
    pub fn attach_file(&mut self, mut file: File<R>) -> &mut File<R> {
        self.detach_file(&file.name);
        file.depth = self.depth + 1;
        self.children.push(Node::File(file));
        match self.children.last_mut() {
            Some(Node::File(file)) => file,
            _ => unreachable!("a file was pushed last"),
        }
    }

    /// Removes and returns the child folder called `name`
    pub fn detach_folder(&mut self, name: &str) -> Option<Folder<R>> {
        let index = self
            .children
            .iter()
            .position(|c| matches!(c, Node::Folder(f) if f.name == name))?;
        match self.children.remove(index) {
            Node::Folder(folder) => Some(folder),
            Node::File(_) => None,
        }
    }

    /// Removes and returns the child file called `name`
    pub fn detach_file(&mut self, name: &str) -> Option<File<R>> {
        let index = self
            .children
            .iter()
            .position(|c| matches!(c, Node::File(f) if f.name == name))?;
        match self.children.remove(index) {
            Node::File(file) => Some(file),
            Node::Folder(_) => None,
        }
    }

    /// Number of nodes below this folder
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Node::Folder(folder) => 1 + folder.descendant_count(),
                Node::File(_) => 1,
            })
            .sum()
    }

    /// Resolves a `/`-separated path relative to this folder.
    ///
    /// The last segment matches a folder before a file of the same name.
    /// An empty path resolves to this folder.
    pub fn locate_mut(&mut self, path: &str) -> Option<NodeRefMut<'_, R>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Some(NodeRefMut::Folder(self));
        };

        let mut current = self;
        for segment in parents {
            current = current.folder_mut(segment)?;
        }

        if current.folder(last).is_some() {
            return current.folder_mut(last).map(NodeRefMut::Folder);
        }
        current.file_mut(last).map(NodeRefMut::File)
    }
}

/// Mutable reference to a node found by path
pub enum NodeRefMut<'a, R: Replica> {
    Folder(&'a mut Folder<R>),
    File(&'a mut File<R>),
}
