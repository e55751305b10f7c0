//! CLI command implementations

pub mod completions;
pub mod config;
pub mod link;
pub mod log;
pub mod select;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use docsync_audit::JsonlAuditStore;
use docsync_cache::{DatabasePool, SqliteLinkStore};
use docsync_core::config::Config;
use docsync_core::domain::Link;
use docsync_core::ports::ILinkStore;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// What every command needs: where the config lives, its contents, and the output format
pub struct CommandContext {
    pub config_path: PathBuf,
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    pub fn new(config_path: PathBuf, config: Config, format: OutputFormat) -> Self {
        Self {
            config_path,
            config,
            format,
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// Opens (creating if needed) the link database named by `storage.database_path`
    pub async fn link_store(&self) -> Result<Arc<dyn ILinkStore>> {
        let db_path = &self.config.storage.database_path;
        let pool = DatabasePool::new(db_path)
            .await
            .with_context(|| format!("Failed to open link database {}", db_path.display()))?;
        Ok(Arc::new(SqliteLinkStore::new(pool.pool().clone())))
    }

    pub fn audit_store(&self) -> JsonlAuditStore {
        JsonlAuditStore::new(self.config.audit.directory.clone())
    }
}

/// Loads a link by name or fails with a message naming it
pub async fn require_link(store: &dyn ILinkStore, name: &str) -> Result<Link> {
    store
        .get_link(name)
        .await
        .with_context(|| format!("Failed to load link '{name}'"))?
        .with_context(|| format!("No link named '{name}'"))
}
