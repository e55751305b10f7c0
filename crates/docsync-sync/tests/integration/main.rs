//! Integration tests for docsync-sync
//!
//! A real temporary directory plays the local side; the remote document
//! service, the link store and the audit sink are Mutex-backed in-memory
//! fakes. Tests drive whole link syncs and runs end to end.

mod common;

mod test_deletion;
mod test_reconcile;
mod test_runner;
mod test_scheduler;
