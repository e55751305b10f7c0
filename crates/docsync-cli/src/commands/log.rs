//! Log command - Inspect the audit log
//!
//! Provides the `docsync log` CLI command which:
//! 1. Lists the days that have audit files
//! 2. Shows the runs of one day as flattened rows with their severity
//! 3. Prunes day files older than the retention window

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Subcommand;
use docsync_audit::AuditRecorder;
use docsync_core::domain::{classify, AuditSummary, RunRecord, Severity};
use docsync_core::ports::IAuditSink;
use tracing::info;

use super::CommandContext;
use crate::output::{fit, severity_marker};

#[derive(Debug, Subcommand)]
pub enum LogCommand {
    /// List days with audit entries
    Days,
    /// Show the runs recorded on one day
    Show {
        /// Day as YYYY-MM-DD, "today" or "yesterday"
        #[arg(default_value = "today")]
        day: String,
        /// Only show this link
        #[arg(long)]
        link: Option<String>,
        /// Only show rows at least this severe (failure, deletion, addition, update, unchanged)
        #[arg(long)]
        min_severity: Option<String>,
    },
    /// Delete day files older than the retention window
    Prune {
        /// Override `audit.retention_days`
        #[arg(long)]
        retention_days: Option<u32>,
    },
}

impl LogCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            LogCommand::Days => self.execute_days(ctx).await,
            LogCommand::Show {
                day,
                link,
                min_severity,
            } => {
                let day = parse_day(day, Local::now().date_naive())?;
                let min_severity = min_severity
                    .as_deref()
                    .map(parse_severity)
                    .transpose()?;
                self.execute_show(ctx, day, link.as_deref(), min_severity)
                    .await
            }
            LogCommand::Prune { retention_days } => {
                let days = retention_days.unwrap_or(ctx.config.audit.retention_days);
                self.execute_prune(ctx, days).await
            }
        }
    }

    async fn execute_days(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.audit_store();
        let days = store.list_days().await.context("Failed to list audit days")?;

        if ctx.format.is_json() {
            let days: Vec<String> = days.iter().map(|d| d.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "directory": store.directory().display().to_string(),
                "days": days,
            }));
            return Ok(());
        }

        if days.is_empty() {
            formatter.info("No audit entries recorded yet.");
            return Ok(());
        }
        formatter.success(&format!("{} day(s) in {}", days.len(), store.directory().display()));
        for day in days {
            formatter.info(&day.to_string());
        }
        Ok(())
    }

    async fn execute_show(
        &self,
        ctx: &CommandContext,
        day: NaiveDate,
        link: Option<&str>,
        min_severity: Option<Severity>,
    ) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.audit_store();
        let runs = store
            .load_day(day)
            .await
            .with_context(|| format!("Failed to load audit entries for {day}"))?;

        info!(day = %day, runs = runs.len(), "Loaded audit day");

        let view = build_view(&runs, link, min_severity);

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "day": day.to_string(),
                "runs": view.runs,
                "summary": view.summary,
            }));
            return Ok(());
        }

        if view.runs.is_empty() {
            formatter.info(&format!("No audit entries for {day}."));
            return Ok(());
        }

        formatter.success(&format!("Audit log for {day} ({} run(s))", view.runs.len()));
        for run in &view.runs {
            formatter.info("");
            formatter.info(&format!("Run at {}", run.timestamp.format("%H:%M:%S")));
            for link in &run.links {
                formatter.info(&format!("  Link {} [{}]", link.name, link.summary));
                formatter.info(&format!(
                    "    {} {:<40} {:<13} {:<13} {}",
                    " ", "Path", "Local", "Remote", "Reason"
                ));
                for row in &link.rows {
                    formatter.info(&format!(
                        "    {} {} {:<13} {:<13} {}",
                        severity_marker(row.severity),
                        fit(&row.path, 40),
                        row.local,
                        row.remote,
                        row.reason.as_deref().unwrap_or("")
                    ));
                }
            }
        }
        formatter.info("");
        formatter.info(&format!("Total: {}", view.summary));
        Ok(())
    }

    async fn execute_prune(&self, ctx: &CommandContext, retention_days: u32) -> Result<()> {
        let formatter = ctx.formatter();
        let store = ctx.audit_store();

        if retention_days == 0 {
            formatter.info("Retention is disabled (0 days); nothing pruned.");
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({ "removed": 0 }));
            }
            return Ok(());
        }

        let recorder = AuditRecorder::new(Arc::new(store));
        let removed = recorder.prune_now(retention_days).await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "removed": removed,
                "retention_days": retention_days,
            }));
        } else {
            formatter.success(&format!(
                "Removed {removed} day file(s) older than {retention_days} day(s)"
            ));
        }
        Ok(())
    }
}

/// Rows of one run, filtered and ready to print
#[derive(Debug, serde::Serialize)]
struct RunView {
    timestamp: chrono::DateTime<chrono::Utc>,
    links: Vec<LinkView>,
}

#[derive(Debug, serde::Serialize)]
struct LinkView {
    name: String,
    summary: AuditSummary,
    rows: Vec<RowView>,
}

#[derive(Debug, serde::Serialize)]
struct RowView {
    path: String,
    kind: String,
    local: String,
    remote: String,
    severity: Severity,
    reason: Option<String>,
}

#[derive(Debug)]
struct DayView {
    runs: Vec<RunView>,
    summary: AuditSummary,
}

fn build_view(runs: &[RunRecord], link: Option<&str>, min_severity: Option<Severity>) -> DayView {
    let mut summary = AuditSummary::default();
    let mut views = Vec::new();

    for run in runs {
        let mut links = Vec::new();
        for record in run.links.iter().filter(|r| link.map_or(true, |l| r.link == l)) {
            let link_summary = record.summary();
            summary.merge(&link_summary);

            let rows = record
                .root
                .flatten()
                .into_iter()
                .filter_map(|row| {
                    let severity = classify(row.local, row.remote);
                    if min_severity.is_some_and(|min| severity > min) {
                        return None;
                    }
                    let path = if row.path.is_empty() {
                        record.link.clone()
                    } else {
                        format!("{}/{}", record.link, row.path)
                    };
                    Some(RowView {
                        path,
                        kind: format!("{:?}", row.kind).to_lowercase(),
                        local: row.local.to_string(),
                        remote: row.remote.to_string(),
                        severity,
                        reason: row.reason.map(|r| r.to_string()),
                    })
                })
                .collect();

            links.push(LinkView {
                name: record.link.clone(),
                summary: link_summary,
                rows,
            });
        }
        if !links.is_empty() {
            views.push(RunView {
                timestamp: run.timestamp,
                links,
            });
        }
    }

    DayView {
        runs: views,
        summary,
    }
}

/// Parses `YYYY-MM-DD`, `today` or `yesterday` relative to `today`
fn parse_day(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    match input.trim() {
        "today" => Ok(today),
        "yesterday" => today
            .pred_opt()
            .context("No day before the first representable date"),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").with_context(|| {
            format!("Could not parse '{other}' as a day. Use YYYY-MM-DD, today or yesterday.")
        }),
    }
}

fn parse_severity(input: &str) -> Result<Severity> {
    let severity = match input.trim().to_lowercase().as_str() {
        "failure" => Severity::Failure,
        "deletion" => Severity::Deletion,
        "addition" => Severity::Addition,
        "update" => Severity::Update,
        "unchanged" => Severity::Unchanged,
        "skipped" => Severity::Skipped,
        other => anyhow::bail!("Unknown severity '{other}'"),
    };
    Ok(severity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docsync_core::domain::{AuditNode, LinkRecord, ReasonCode, RemoteId, SyncStatus::*};
    use std::path::PathBuf;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_run() -> RunRecord {
        let mut root = AuditNode::folder("work", NoChanges, NoChanges);
        let mut docs = AuditNode::folder("docs", Synced, Added);
        docs.push(AuditNode::file("a.txt", Synced, Synced));
        docs.push(AuditNode::file("b.exe", Error, NotSynced).with_reason(ReasonCode::ForbiddenExtension));
        root.push(docs);

        let mut run = RunRecord::new();
        run.push(LinkRecord {
            link: "work".to_string(),
            local_root: PathBuf::from("/work"),
            remote_root: RemoteId::new(),
            timestamp: Utc::now(),
            root,
        });
        run.push(LinkRecord::failed("home", PathBuf::from("/home"), RemoteId::new()));
        run
    }

    #[test]
    fn test_parse_day() {
        let today = day("2024-03-01");
        assert_eq!(parse_day("today", today).unwrap(), today);
        assert_eq!(parse_day("yesterday", today).unwrap(), day("2024-02-29"));
        assert_eq!(parse_day("2023-12-31", today).unwrap(), day("2023-12-31"));
        assert!(parse_day("31/12/2023", today).is_err());
    }

    #[test]
    fn test_parse_severity() {
        assert_eq!(parse_severity("Failure").unwrap(), Severity::Failure);
        assert_eq!(parse_severity(" update ").unwrap(), Severity::Update);
        assert!(parse_severity("fatal").is_err());
    }

    #[test]
    fn test_build_view_rows_and_summary() {
        let view = build_view(&[sample_run()], None, None);

        assert_eq!(view.runs.len(), 1);
        let work = &view.runs[0].links[0];
        let paths: Vec<&str> = work.rows.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["work", "work/docs", "work/docs/a.txt", "work/docs/b.exe"]);
        assert_eq!(work.rows[3].reason.as_deref(), Some("forbidden_extension"));
        assert_eq!(work.rows[3].kind, "file");
        // b.exe plus the failed "home" link
        assert_eq!(view.summary.failures(), 2);
        assert_eq!(view.summary.total(), 5);
    }

    #[test]
    fn test_build_view_filters() {
        let view = build_view(&[sample_run()], Some("work"), Some(Severity::Failure));

        assert_eq!(view.runs[0].links.len(), 1);
        let rows = &view.runs[0].links[0].rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "work/docs/b.exe");
        // the summary still counts every entry of the selected link
        assert_eq!(view.summary.total(), 4);
    }

    #[test]
    fn test_build_view_unknown_link_is_empty() {
        let view = build_view(&[sample_run()], Some("nope"), None);
        assert!(view.runs.is_empty());
        assert_eq!(view.summary.total(), 0);
    }
}
