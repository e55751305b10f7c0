//! SQLite implementation of ILinkStore
//!
//! ## Type Mapping
//!
//! | Domain Type          | SQL Type | Strategy                                  |
//! |----------------------|----------|-------------------------------------------|
//! | link name            | TEXT     | primary key                               |
//! | flags                | INTEGER  | 0 / 1                                     |
//! | PathBuf              | TEXT     | lossy UTF-8 string                        |
//! | RemoteId, Uuid       | TEXT     | hyphenated UUID via `Display` / `FromStr` |
//! | LocalFolder tree     | TEXT     | serde_json document                       |
//! | RemoteFolder tree    | TEXT     | serde_json document                       |
//! | DateTime<Utc>        | TEXT     | RFC 3339                                  |

use std::path::PathBuf;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use docsync_core::domain::{Link, LocalFolder, ProjectRef, RemoteFolder, RemoteId};
use docsync_core::ports::ILinkStore;

use crate::CacheError;

/// SQLite-backed link store
pub struct SqliteLinkStore {
    pool: SqlitePool,
}

impl SqliteLinkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn upsert(&self, link: &Link) -> Result<(), CacheError> {
        let local_tree = serde_json::to_string(link.local_tree())?;
        let remote_tree = serde_json::to_string(link.remote_tree())?;
        let local_root = link.local_root().to_string_lossy().into_owned();
        let project = link.project();

        let result = sqlx::query(
            "INSERT INTO links \
             (name, active, sync_upload, sync_download, local_root, remote_root_id, \
              project_id, project_uuid, project_name, local_tree, remote_tree, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(name) DO UPDATE SET \
              active = excluded.active, \
              sync_upload = excluded.sync_upload, \
              sync_download = excluded.sync_download, \
              local_root = excluded.local_root, \
              remote_root_id = excluded.remote_root_id, \
              project_id = excluded.project_id, \
              project_uuid = excluded.project_uuid, \
              project_name = excluded.project_name, \
              local_tree = excluded.local_tree, \
              remote_tree = excluded.remote_tree, \
              updated_at = excluded.updated_at",
        )
        .bind(link.name())
        .bind(link.is_active())
        .bind(link.sync_upload())
        .bind(link.sync_download())
        .bind(&local_root)
        .bind(link.remote_root_id().to_string())
        .bind(project.id)
        .bind(project.uuid.to_string())
        .bind(&project.name)
        .bind(&local_tree)
        .bind(&remote_tree)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CacheError::DuplicateRoot(local_root))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn link_from_row(row: &SqliteRow) -> Result<Link, CacheError> {
    let remote_root_id: String = row.try_get("remote_root_id")?;
    let remote_root_id: RemoteId = remote_root_id
        .parse()
        .map_err(|e| CacheError::SerializationError(format!("remote_root_id: {e}")))?;

    let project_uuid: String = row.try_get("project_uuid")?;
    let project = ProjectRef {
        id: row.try_get("project_id")?,
        uuid: Uuid::parse_str(&project_uuid)
            .map_err(|e| CacheError::SerializationError(format!("project_uuid: {e}")))?,
        name: row.try_get("project_name")?,
    };

    let local_root: String = row.try_get("local_root")?;
    let local_tree: String = row.try_get("local_tree")?;
    let remote_tree: String = row.try_get("remote_tree")?;
    let local_tree: LocalFolder = serde_json::from_str(&local_tree)?;
    let remote_tree: RemoteFolder = serde_json::from_str(&remote_tree)?;

    Ok(Link::from_parts(
        row.try_get("name")?,
        row.try_get("active")?,
        row.try_get("sync_upload")?,
        row.try_get("sync_download")?,
        PathBuf::from(local_root),
        remote_root_id,
        project,
        local_tree,
        remote_tree,
    ))
}

#[async_trait::async_trait]
impl ILinkStore for SqliteLinkStore {
    async fn load_links(&self) -> anyhow::Result<Vec<Link>> {
        let rows = sqlx::query("SELECT * FROM links ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let links = rows
            .iter()
            .map(link_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::trace!(count = links.len(), "Loaded links");
        Ok(links)
    }

    async fn get_link(&self, name: &str) -> anyhow::Result<Option<Link>> {
        let row = sqlx::query("SELECT * FROM links WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(link_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn save_link(&self, link: &Link) -> anyhow::Result<()> {
        self.upsert(link).await?;
        tracing::trace!(link = %link.name(), "Saved link");
        Ok(())
    }

    async fn remove_link(&self, name: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
