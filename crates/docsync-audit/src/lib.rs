//! docsync Audit - Run records on disk
//!
//! Provides:
//! - `JsonlAuditStore`: an `IAuditSink` writing one JSON Lines file per day
//! - `AuditRecorder`: non-fatal recording and retention pruning

pub mod recorder;
pub mod store;

pub use recorder::AuditRecorder;
pub use store::JsonlAuditStore;
