//! Link store port (driven/secondary port)
//!
//! Persists the configured links together with the bookkeeping of both of
//! their trees. The store is read at startup and rewritten whenever a link
//! is added, edited, removed or synced.
//!
//! ## Design Notes
//!
//! - Link names are the primary key.
//! - `save_link` is an upsert taking a reference so the caller keeps ownership.

use async_trait::async_trait;

use crate::domain::link::Link;

/// Port trait for link persistence
#[async_trait]
pub trait ILinkStore: Send + Sync {
    /// All links, ordered by name
    async fn load_links(&self) -> anyhow::Result<Vec<Link>>;

    async fn get_link(&self, name: &str) -> anyhow::Result<Option<Link>>;

    /// Inserts or replaces the link with the same name
    async fn save_link(&self, link: &Link) -> anyhow::Result<()>;

    /// Removes a link; `Ok(false)` when no link had that name
    async fn remove_link(&self, name: &str) -> anyhow::Result<bool>;
}
