//! docsync Core - Domain model and collaborator ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Tree model** - `Folder`/`File` nodes in `Local` and `Remote` variants
//! - **Change detection** - per-file sync state derived from timestamps and versions
//! - **Selection rules** - the tri-state Include/Exclude/Partial reconciler
//! - **Audit tree** - per-node outcome statuses folded into run records
//! - **Port definitions** - `ILocalSource`, `IRemoteSource`, `IConflictDecisionProvider`,
//!   `IAuditSink`, `ILinkStore`
//!
//! # Architecture
//!
//! The domain module is pure data and rules with no I/O. Ports define the
//! trait interfaces that adapter crates implement; the reconciliation engine
//! in `docsync-sync` drives the domain through them.

pub mod config;
pub mod domain;
pub mod ports;
