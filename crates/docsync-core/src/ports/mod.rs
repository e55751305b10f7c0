//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the collaborator contracts the reconciliation engine depends
//! on. Their implementations live in adapter crates or, for the remote
//! transport and the interactive prompt, in the embedding application.
//!
//! ## Ports Overview
//!
//! - [`ILocalSource`] - Directory listing and file/directory mutation on disk
//! - [`IRemoteSource`] - Folder listing and document transfer on the remote service
//! - [`IConflictDecisionProvider`] - Operator decisions for two-sided edits
//! - [`IAuditSink`] - Date-bucketed persistence of run records
//! - [`ILinkStore`] - Persistence of configured links and their trees

pub mod audit_sink;
pub mod decision;
pub mod link_store;
pub mod local_source;
pub mod remote_source;

pub use audit_sink::IAuditSink;
pub use decision::{ConflictChoice, ConflictDecision, IConflictDecisionProvider};
pub use link_store::ILinkStore;
pub use local_source::{DirListing, ILocalSource, LocalFileEntry};
pub use remote_source::{
    DownloadReceipt, FolderListing, IRemoteSource, RemoteDocumentEntry, RemoteFolderEntry,
    UploadReceipt,
};
