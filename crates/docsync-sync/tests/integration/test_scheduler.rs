//! Periodic runs and their cancellation

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use tokio_util::sync::CancellationToken;

use docsync_audit::AuditRecorder;
use docsync_conflict::PolicyEngine;
use docsync_sync::{LinkRunner, Schedule, SyncScheduler};

use crate::common::{Fixture, MemoryAuditSink, MemoryLinkStore};

fn runner(fx: &Fixture, sink: Arc<MemoryAuditSink>) -> Arc<LinkRunner> {
    Arc::new(LinkRunner::new(
        fx.engine(),
        Arc::new(MemoryLinkStore::default()),
        AuditRecorder::new(sink),
        Arc::new(PolicyEngine::default()),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_interval_runs_then_waits() {
    let fx = Fixture::new();
    let sink = Arc::new(MemoryAuditSink::default());
    let cancel = CancellationToken::new();
    let scheduler = SyncScheduler::new(
        runner(&fx, sink.clone()),
        Schedule::Interval(Duration::from_secs(10)),
        cancel.clone(),
    );

    let handle = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(Duration::from_secs(35)).await;
    cancel.cancel();

    let runs = handle.await.unwrap();
    assert_eq!(runs, 4);
    assert_eq!(sink.runs().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_daily_waits_before_first_run() {
    let fx = Fixture::new();
    let sink = Arc::new(MemoryAuditSink::default());
    let cancel = CancellationToken::new();
    let scheduler = SyncScheduler::new(
        runner(&fx, sink.clone()),
        Schedule::Daily(NaiveTime::from_hms_opt(3, 0, 0).unwrap()),
        cancel.clone(),
    );

    let handle = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(Duration::from_millis(1)).await;
    cancel.cancel();

    assert_eq!(handle.await.unwrap(), 0);
    assert!(sink.runs().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start_does_nothing() {
    let fx = Fixture::new();
    let sink = Arc::new(MemoryAuditSink::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let scheduler = SyncScheduler::new(
        runner(&fx, sink.clone()),
        Schedule::Interval(Duration::from_secs(3600)),
        cancel,
    );

    assert_eq!(scheduler.run().await, 0);
    assert!(sink.runs().is_empty());
}
