//! Tri-state selection and the selection reconciler
//!
//! Every node carries a [`Selection`]. After a structural refresh or a
//! manual edit, [`reconcile_selection`] restores the tree-wide invariant:
//! a folder is `Partial` exactly when it has at least one included and at
//! least one excluded descendant, and otherwise collapses to `Include` or
//! `Exclude`.
//!
//! One shortcut takes precedence over the bottom-up pass: when exactly one
//! file in the subtree is marked `Include` and no included folder lies off
//! its ancestor chain, everything else is excluded, the file stays included
//! and its ancestor chain becomes `Partial`. An included folder elsewhere
//! (an empty one, say) blocks the shortcut and is reported as
//! [`SelectionAnomaly::SingleFileBlocked`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::tree::{Folder, Node, NodeRefMut, Replica};

/// Tri-state inclusion marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// The node and all of its descendants take part in sync
    Include,
    /// The node and all of its descendants are skipped
    Exclude,
    /// Some descendants are included and some are not (folders only)
    Partial,
}

impl Selection {
    /// Eligibility: anything but `Exclude`
    pub fn is_to_sync(self) -> bool {
        self != Selection::Exclude
    }

    /// Selection given to a node first discovered under a parent with this selection
    pub fn inherited(self) -> Selection {
        match self {
            Selection::Include => Selection::Include,
            Selection::Exclude | Selection::Partial => Selection::Exclude,
        }
    }

    pub(crate) fn for_leaf(self) -> Selection {
        match self {
            Selection::Partial => Selection::Include,
            other => other,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Selection::Include => "include",
            Selection::Exclude => "exclude",
            Selection::Partial => "partial",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Selection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "include" => Ok(Selection::Include),
            "exclude" => Ok(Selection::Exclude),
            "partial" => Ok(Selection::Partial),
            other => Err(DomainError::InvalidSelection(other.to_string())),
        }
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// A case the reconciler resolved by rule but that deserves manual review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionAnomaly {
    /// Exactly one file is included, but an included folder outside its
    /// ancestor chain kept the single-file shortcut from firing
    SingleFileBlocked { file: String, folder: String },
}

impl fmt::Display for SelectionAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionAnomaly::SingleFileBlocked { file, folder } => write!(
                f,
                "'{file}' is the only included file, but included folder '{folder}' keeps the rest of the tree selected"
            ),
        }
    }
}

/// Outcome of one reconciler pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionReport {
    /// Path of the file kept by the single-file shortcut, when it fired
    pub singleton: Option<String>,
    pub anomalies: Vec<SelectionAnomaly>,
}

impl SelectionReport {
    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    included: usize,
    excluded: usize,
}

impl Tally {
    fn count(&mut self, selection: Selection) {
        match selection {
            Selection::Include => self.included += 1,
            Selection::Exclude => self.excluded += 1,
            // a partial folder's descendants are counted individually
            Selection::Partial => {}
        }
    }

    fn absorb(&mut self, other: Tally) {
        self.included += other.included;
        self.excluded += other.excluded;
    }
}

/// Restores the tri-state invariant over the subtree rooted at `root`
///
/// When exactly one file is included and every included folder lies on
/// that file's ancestor chain, the tree collapses to that file: everything
/// else becomes `Exclude` and its ancestors become `Partial`. An included
/// folder anywhere else stops the shortcut and is reported.
pub fn reconcile_selection<R: Replica>(root: &mut Folder<R>) -> SelectionReport {
    let mut files = Vec::new();
    let mut folders = Vec::new();
    collect_included(root, "", &mut files, &mut folders);

    if files.len() != 1 {
        normalize(root);
        return SelectionReport::default();
    }

    let file_path = files.remove(0);
    let anomalies: Vec<SelectionAnomaly> = folders
        .into_iter()
        .filter(|folder| !file_path.starts_with(&format!("{folder}/")))
        .map(|folder| SelectionAnomaly::SingleFileBlocked {
            file: file_path.clone(),
            folder,
        })
        .collect();

    if !anomalies.is_empty() {
        for anomaly in &anomalies {
            tracing::warn!(
                side = %R::SIDE,
                anomaly = %anomaly,
                "Single-file selection blocked by an included folder"
            );
        }
        normalize(root);
        return SelectionReport {
            singleton: None,
            anomalies,
        };
    }

    root.set_all(Selection::Exclude);
    let segments: Vec<&str> = file_path.split('/').collect();
    force_chain(root, &segments);

    SelectionReport {
        singleton: Some(file_path),
        anomalies,
    }
}

/// Applies an explicit selection to the node at `path`, then reconciles.
///
/// `Include` and `Exclude` cascade to all descendants. `Partial` is only
/// accepted on folders.
pub fn apply_selection<R: Replica>(
    root: &mut Folder<R>,
    path: &str,
    selection: Selection,
) -> Result<SelectionReport, DomainError> {
    match root.locate_mut(path) {
        None => return Err(DomainError::NodeNotFound(path.to_string())),
        Some(NodeRefMut::Folder(folder)) => match selection {
            Selection::Partial => folder.set_selection(Selection::Partial),
            other => folder.set_all(other),
        },
        Some(NodeRefMut::File(file)) => {
            if selection == Selection::Partial {
                return Err(DomainError::InvalidSelection(format!(
                    "'{path}' is a file and cannot be partial"
                )));
            }
            file.set_selection(selection);
        }
    }
    Ok(reconcile_selection(root))
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Paths of the included files and included folders below `folder`
fn collect_included<R: Replica>(
    folder: &Folder<R>,
    prefix: &str,
    files: &mut Vec<String>,
    folders: &mut Vec<String>,
) {
    for child in folder.children() {
        match child {
            Node::File(file) if file.selection() == Selection::Include => {
                files.push(join(prefix, file.name()));
            }
            Node::File(_) => {}
            Node::Folder(sub) => {
                let path = join(prefix, sub.name());
                if sub.selection() == Selection::Include {
                    folders.push(path.clone());
                }
                collect_included(sub, &path, files, folders);
            }
        }
    }
}

/// Marks the kept file `Include` and its ancestors `Partial`, bottom-up.
/// An ancestor with nothing excluded below it collapses to `Include`.
fn force_chain<R: Replica>(folder: &mut Folder<R>, segments: &[&str]) {
    match segments {
        [file] => {
            if let Some(file) = folder.file_mut(file) {
                file.set_selection(Selection::Include);
            }
        }
        [head, rest @ ..] => {
            if let Some(child) = folder.folder_mut(head) {
                force_chain(child, rest);
            }
        }
        [] => {}
    }

    let tally = tally(folder);
    if tally.excluded == 0 {
        folder.set_selection(Selection::Include);
    } else {
        folder.set_selection(Selection::Partial);
    }
}

fn tally<R: Replica>(folder: &Folder<R>) -> Tally {
    let mut tally = Tally::default();
    for child in folder.children() {
        if let Node::Folder(sub) = child {
            tally.absorb(self::tally(sub));
        }
        tally.count(child.selection());
    }
    tally
}

/// Bottom-up pass returning the tally of the folder's descendants
fn normalize<R: Replica>(folder: &mut Folder<R>) -> Tally {
    let mut tally = Tally::default();
    for child in folder.children_mut() {
        match child {
            Node::File(file) => tally.count(file.selection()),
            Node::Folder(sub) => {
                let inner = normalize(sub);
                tally.absorb(inner);
                tally.count(sub.selection());
            }
        }
    }

    let derived = match (tally.included > 0, tally.excluded > 0) {
        (true, true) => Selection::Partial,
        (true, false) => Selection::Include,
        (false, true) => Selection::Exclude,
        (false, false) => match folder.selection() {
            Selection::Partial => Selection::Exclude,
            own => own,
        },
    };
    folder.set_selection(derived);
    tally
}
