//! Select command - Edit which parts of a link take part in sync
//!
//! `docsync select <link> <path> <include|exclude|partial>` applies the
//! choice to the node at `path` (relative to the link root, `/`-separated;
//! an empty path is the root). Include and exclude cascade to the whole
//! subtree. The selection rules are then re-applied to the edited tree and
//! any case they could not resolve cleanly is reported.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use docsync_core::domain::{apply_selection, Link, Selection, SelectionReport};
use tracing::info;

use super::{require_link, CommandContext};

/// Which of a link's trees to edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    Local,
    Remote,
    Both,
}

#[derive(Debug, Args)]
pub struct SelectCommand {
    /// Link name
    pub link: String,
    /// Node path relative to the link root (empty for the root)
    pub path: String,
    /// include, exclude or partial
    pub selection: Selection,
    /// Tree to edit
    #[arg(long, value_enum, default_value = "both")]
    pub side: SideArg,
}

impl SelectCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.link_store().await?;
        let mut link = require_link(store.as_ref(), &self.link).await?;

        let reports = edit_selection(&mut link, &self.path, self.selection, self.side)?;

        store
            .save_link(&link)
            .await
            .with_context(|| format!("Failed to save link '{}'", self.link))?;

        info!(
            link = %self.link,
            path = %self.path,
            selection = %self.selection,
            "Selection updated"
        );

        if ctx.format.is_json() {
            let sides: Vec<serde_json::Value> = reports
                .iter()
                .map(|(side, report)| {
                    serde_json::json!({
                        "side": side,
                        "singleton": report.singleton,
                        "anomalies": report.anomalies,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "link": self.link,
                "path": self.path,
                "selection": self.selection,
                "sides": sides,
            }));
            return Ok(());
        }

        formatter.success(&format!(
            "Set '{}' to {} in link '{}'",
            display_path(&self.path),
            self.selection,
            self.link
        ));
        for (side, report) in &reports {
            if let Some(kept) = &report.singleton {
                formatter.info(&format!(
                    "{side}: only '{kept}' is included, everything else was excluded"
                ));
            }
            for anomaly in &report.anomalies {
                formatter.warn(&format!("{side}: {anomaly}"));
            }
        }
        Ok(())
    }
}

/// Applies `selection` at `path` on the requested trees of `link`
///
/// With `SideArg::Both` the path must exist in both trees.
pub fn edit_selection(
    link: &mut Link,
    path: &str,
    selection: Selection,
    side: SideArg,
) -> Result<Vec<(&'static str, SelectionReport)>> {
    let mut reports = Vec::new();

    // validate both trees before mutating either
    if side == SideArg::Both {
        let mut local = link.local_tree().clone();
        let mut remote = link.remote_tree().clone();
        apply_selection(&mut local, path, selection).context("local tree")?;
        apply_selection(&mut remote, path, selection).context("remote tree")?;
    }

    if matches!(side, SideArg::Local | SideArg::Both) {
        let report = apply_selection(link.local_tree_mut(), path, selection)
            .context("local tree")?;
        reports.push(("local", report));
    }
    if matches!(side, SideArg::Remote | SideArg::Both) {
        let report = apply_selection(link.remote_tree_mut(), path, selection)
            .context("remote tree")?;
        reports.push(("remote", report));
    }
    Ok(reports)
}

fn display_path(path: &str) -> &str {
    if path.trim_matches('/').is_empty() {
        "/"
    } else {
        path
    }
}
