//! Link command - Manage configured links
//!
//! Provides the `docsync link` CLI command which:
//! 1. Adds a link between a local directory and a remote project folder
//! 2. Lists links with their direction and tree sizes
//! 3. Shows one link's trees with the selection of every node
//! 4. Enables, disables, re-directs and removes links

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use docsync_core::domain::{Folder, Link, Node, ProjectRef, RemoteId, Replica};
use tracing::info;
use uuid::Uuid;

use super::{require_link, CommandContext};

/// Direction as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Bidirectional,
    UploadOnly,
    DownloadOnly,
    Disabled,
}

impl DirectionArg {
    /// `(sync_upload, sync_download)` flags for this direction
    pub fn flags(self) -> (bool, bool) {
        match self {
            DirectionArg::Bidirectional => (true, true),
            DirectionArg::UploadOnly => (true, false),
            DirectionArg::DownloadOnly => (false, true),
            DirectionArg::Disabled => (false, false),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum LinkCommand {
    /// Link a local directory to a remote folder
    Add {
        /// Unique link name
        name: String,
        /// Local root directory
        local_root: PathBuf,
        /// Identifier of the remote root folder
        #[arg(long)]
        remote_root: RemoteId,
        /// Numeric id of the remote project
        #[arg(long)]
        project_id: i64,
        /// UUID of the remote project
        #[arg(long)]
        project_uuid: Uuid,
        /// Display name of the remote project
        #[arg(long)]
        project_name: String,
        /// Which way content flows
        #[arg(long, value_enum, default_value = "bidirectional")]
        direction: DirectionArg,
    },
    /// List configured links
    List,
    /// Show a link's trees and the selection of each node
    Show {
        name: String,
    },
    /// Include a link in runs
    Enable {
        name: String,
    },
    /// Skip a link in runs without forgetting its state
    Disable {
        name: String,
    },
    /// Change which way content flows for a link
    Direction {
        name: String,
        #[arg(value_enum)]
        direction: DirectionArg,
    },
    /// Forget a link and its stored trees
    Remove {
        name: String,
    },
}

impl LinkCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            LinkCommand::Add {
                name,
                local_root,
                remote_root,
                project_id,
                project_uuid,
                project_name,
                direction,
            } => {
                let project = ProjectRef {
                    id: *project_id,
                    uuid: *project_uuid,
                    name: project_name.clone(),
                };
                self.execute_add(ctx, name, local_root, *remote_root, project, *direction)
                    .await
            }
            LinkCommand::List => self.execute_list(ctx).await,
            LinkCommand::Show { name } => self.execute_show(ctx, name).await,
            LinkCommand::Enable { name } => self.execute_set_active(ctx, name, true).await,
            LinkCommand::Disable { name } => self.execute_set_active(ctx, name, false).await,
            LinkCommand::Direction { name, direction } => {
                self.execute_direction(ctx, name, *direction).await
            }
            LinkCommand::Remove { name } => self.execute_remove(ctx, name).await,
        }
    }

    async fn execute_add(
        &self,
        ctx: &CommandContext,
        name: &str,
        local_root: &Path,
        remote_root: RemoteId,
        project: ProjectRef,
        direction: DirectionArg,
    ) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.link_store().await?;

        if store.get_link(name).await?.is_some() {
            anyhow::bail!("A link named '{name}' already exists");
        }

        let local_root = if local_root.is_absolute() {
            local_root.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Failed to resolve the current directory")?
                .join(local_root)
        };
        let mut link = Link::new(name, local_root, remote_root, project)?;
        let (upload, download) = direction.flags();
        link.set_directions(upload, download);

        store
            .save_link(&link)
            .await
            .with_context(|| format!("Failed to save link '{name}'"))?;

        info!(link = %name, root = %link.local_root().display(), "Link added");

        if ctx.format.is_json() {
            formatter.print_json(&link_summary_json(&link));
        } else {
            formatter.success(&format!(
                "Linked {} to {} ({})",
                link.local_root().display(),
                link.project().name,
                link.direction()
            ));
        }
        Ok(())
    }

    async fn execute_list(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.link_store().await?;
        let links = store.load_links().await.context("Failed to load links")?;

        if ctx.format.is_json() {
            let items: Vec<serde_json::Value> = links.iter().map(link_summary_json).collect();
            formatter.print_json(&serde_json::json!({ "links": items }));
            return Ok(());
        }

        if links.is_empty() {
            formatter.info("No links configured. Use 'docsync link add' to create one.");
            return Ok(());
        }

        formatter.success(&format!("{} link(s)", links.len()));
        formatter.info("");
        for link in &links {
            let state = if link.is_active() { "active" } else { "inactive" };
            formatter.info(&format!(
                "{:<16} {:<8} {:<14} {}",
                link.name(),
                state,
                link.direction().to_string(),
                link.local_root().display()
            ));
            formatter.info(&format!(
                "{:<16} project {} ({} local / {} remote nodes)",
                "",
                link.project().name,
                link.local_tree().descendant_count(),
                link.remote_tree().descendant_count()
            ));
        }
        Ok(())
    }

    async fn execute_show(&self, ctx: &CommandContext, name: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.link_store().await?;
        let link = require_link(store.as_ref(), name).await?;

        if ctx.format.is_json() {
            let mut json = link_summary_json(&link);
            json["local_tree"] = tree_json(link.local_tree());
            json["remote_tree"] = tree_json(link.remote_tree());
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("{} ({})", link.name(), link.direction()));
        formatter.info(&format!("Local root:  {}", link.local_root().display()));
        formatter.info(&format!("Remote root: {}", link.remote_root_id()));
        formatter.info("");
        formatter.info("Local tree:");
        for line in tree_lines(link.local_tree()) {
            formatter.info(&line);
        }
        formatter.info("");
        formatter.info("Remote tree:");
        for line in tree_lines(link.remote_tree()) {
            formatter.info(&line);
        }
        Ok(())
    }

    async fn execute_set_active(&self, ctx: &CommandContext, name: &str, active: bool) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.link_store().await?;
        let mut link = require_link(store.as_ref(), name).await?;

        link.set_active(active);
        store.save_link(&link).await.context("Failed to save link")?;
        info!(link = %name, active, "Link activation changed");

        if ctx.format.is_json() {
            formatter.print_json(&link_summary_json(&link));
        } else if active {
            formatter.success(&format!("Link '{name}' enabled"));
        } else {
            formatter.success(&format!("Link '{name}' disabled"));
        }
        Ok(())
    }

    async fn execute_direction(
        &self,
        ctx: &CommandContext,
        name: &str,
        direction: DirectionArg,
    ) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.link_store().await?;
        let mut link = require_link(store.as_ref(), name).await?;

        let (upload, download) = direction.flags();
        link.set_directions(upload, download);
        store.save_link(&link).await.context("Failed to save link")?;
        info!(link = %name, direction = %link.direction(), "Link direction changed");

        if ctx.format.is_json() {
            formatter.print_json(&link_summary_json(&link));
        } else {
            formatter.success(&format!("Link '{name}' is now {}", link.direction()));
        }
        Ok(())
    }

    async fn execute_remove(&self, ctx: &CommandContext, name: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.link_store().await?;

        let removed = store
            .remove_link(name)
            .await
            .with_context(|| format!("Failed to remove link '{name}'"))?;
        if !removed {
            anyhow::bail!("No link named '{name}'");
        }
        info!(link = %name, "Link removed");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({ "removed": name }));
        } else {
            formatter.success(&format!("Link '{name}' removed"));
            formatter.info("Files on both sides were left untouched.");
        }
        Ok(())
    }
}

fn link_summary_json(link: &Link) -> serde_json::Value {
    serde_json::json!({
        "name": link.name(),
        "active": link.is_active(),
        "direction": link.direction(),
        "local_root": link.local_root().display().to_string(),
        "remote_root": link.remote_root_id().to_string(),
        "project": link.project(),
        "local_nodes": link.local_tree().descendant_count(),
        "remote_nodes": link.remote_tree().descendant_count(),
    })
}

/// Indented `name [selection]` lines, folders before files
fn tree_lines<R: Replica>(root: &Folder<R>) -> Vec<String> {
    let mut lines = Vec::new();
    push_tree_lines(root, 0, &mut lines);
    lines
}

fn push_tree_lines<R: Replica>(folder: &Folder<R>, indent: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(indent);
    let gone = if folder.is_tombstoned() { " (missing)" } else { "" };
    lines.push(format!("{pad}{}/ [{}]{gone}", folder.name(), folder.selection()));
    for sub in folder.folders() {
        push_tree_lines(sub, indent + 1, lines);
    }
    for file in folder.files() {
        lines.push(format!("{pad}  {} [{}]", file.name(), file.selection()));
    }
}

fn tree_json<R: Replica>(folder: &Folder<R>) -> serde_json::Value {
    let children: Vec<serde_json::Value> = folder
        .children()
        .iter()
        .map(|child| match child {
            Node::Folder(sub) => tree_json(sub),
            Node::File(file) => serde_json::json!({
                "name": file.name(),
                "kind": "file",
                "selection": file.selection(),
            }),
        })
        .collect();
    serde_json::json!({
        "name": folder.name(),
        "kind": "folder",
        "selection": folder.selection(),
        "missing": folder.is_tombstoned(),
        "children": children,
    })
}
