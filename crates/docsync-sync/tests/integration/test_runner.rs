//! Runs over all links: persistence, audit, progress, cancellation and the
//! per-link scope of a remembered conflict choice

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use docsync_audit::AuditRecorder;
use docsync_conflict::PolicyEngine;
use docsync_core::config::{Config, ConfigBuilder};
use docsync_core::domain::{ReasonCode, SyncStatus::*};
use docsync_core::ports::{ConflictChoice, ConflictDecision};
use docsync_sync::LinkRunner;

use crate::common::{outcome, CountingProvider, Fixture, MemoryAuditSink, MemoryLinkStore};

struct Setup {
    fx: Fixture,
    store: Arc<MemoryLinkStore>,
    sink: Arc<MemoryAuditSink>,
}

impl Setup {
    /// Two links, `alpha` and `beta`, each with two local files
    fn new() -> Self {
        let fx = Fixture::new();
        let store = Arc::new(MemoryLinkStore::default());
        for name in ["alpha", "beta"] {
            let link = fx.add_link(name);
            fx.write_local(&link, "one.txt", "1");
            fx.write_local(&link, "two.txt", "2");
            store.insert(link);
        }
        Self {
            fx,
            store,
            sink: Arc::new(MemoryAuditSink::default()),
        }
    }

    fn runner_from(&self, config: &Config) -> LinkRunner {
        LinkRunner::from_config(
            self.fx.engine(),
            self.store.clone(),
            AuditRecorder::new(self.sink.clone()),
            config,
        )
    }

    fn runner(&self, policy: &str) -> LinkRunner {
        LinkRunner::new(
            self.fx.engine(),
            self.store.clone(),
            AuditRecorder::new(self.sink.clone()),
            Arc::new(PolicyEngine::new(policy, &[])),
        )
    }
}

#[tokio::test]
async fn test_run_syncs_saves_and_records_every_link() {
    let setup = Setup::new();

    let run = setup
        .runner("ask")
        .run(&CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<&str> = run.links.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(outcome(&run.links[0].root, "one.txt"), (Synced, Synced));
    assert_eq!(setup.store.saves(), 2);
    assert_eq!(setup.sink.runs(), vec![run]);

    let saved = setup.store.get("beta").unwrap();
    let state = saved.remote_tree().file("two.txt").unwrap().state();
    assert_eq!(state.last_synced_version, Some(1));
}

#[tokio::test]
async fn test_inactive_links_are_skipped() {
    let setup = Setup::new();
    let mut beta = setup.store.get("beta").unwrap();
    beta.set_active(false);
    setup.store.insert(beta);

    let run = setup
        .runner("ask")
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.links.len(), 1);
    assert!(run.link("beta").is_none());
}

#[tokio::test]
async fn test_failed_link_becomes_error_record_and_run_continues() {
    let setup = Setup::new();
    let alpha = setup.store.get("alpha").unwrap();
    setup.fx.local.fail_listing(alpha.local_root().clone());
    setup.fx.remote.fail_listing(alpha.remote_root_id());

    let run = setup
        .runner("ask")
        .run(&CancellationToken::new())
        .await
        .unwrap();

    let failed = run.link("alpha").unwrap();
    assert!(failed.is_failed());
    assert_eq!(failed.root.reason, Some(ReasonCode::TransportError));
    assert_eq!(failed.root.entry_count(), 1);
    assert!(!run.link("beta").unwrap().is_failed());
    assert_eq!(setup.store.saves(), 2);
}

#[tokio::test]
async fn test_progress_is_reported_before_each_link() {
    let setup = Setup::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    setup
        .runner("ask")
        .with_progress(Box::new(move |index, total, name| {
            sink.lock().unwrap().push((index, total, name.to_string()));
        }))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(0, 2, "alpha".to_string()), (1, 2, "beta".to_string())]
    );
}

#[tokio::test]
async fn test_cancellation_is_honoured_between_links() {
    let setup = Setup::new();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let run = setup
        .runner("ask")
        .with_progress(Box::new(move |_, _, _| trigger.cancel()))
        .run(&cancel)
        .await
        .unwrap();

    assert_eq!(run.links.len(), 1, "the started link completes");
    assert_eq!(run.links[0].link, "alpha");
    assert_eq!(setup.sink.runs().len(), 1);
}

#[tokio::test]
async fn test_remembered_choice_is_reset_for_each_link() {
    let setup = Setup::new();
    setup
        .runner("ask")
        .run(&CancellationToken::new())
        .await
        .unwrap();

    for name in ["alpha", "beta"] {
        let link = setup.store.get(name).unwrap();
        for file in ["one.txt", "two.txt"] {
            setup.fx.write_local(&link, file, "local edit");
            setup
                .fx
                .remote
                .put_document(link.remote_root_id(), file, b"remote edit");
        }
    }

    let provider = Arc::new(CountingProvider::new(ConflictDecision::remembered(
        ConflictChoice::PreferLocal,
    )));
    let run = setup
        .runner("ask")
        .with_provider(provider.clone())
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(provider.asked(), vec!["one.txt", "one.txt"]);
    for record in &run.links {
        assert_eq!(outcome(&record.root, "one.txt"), (Synced, Synced));
        assert_eq!(outcome(&record.root, "two.txt"), (Synced, Synced));
    }
    let alpha = setup.store.get("alpha").unwrap();
    assert_eq!(
        setup.fx.remote.document(alpha.remote_root_id(), "two.txt").unwrap().1,
        b"local edit"
    );
}

#[tokio::test]
async fn test_runner_from_config_applies_policies_and_deletion() {
    let setup = Setup::new();
    let config = ConfigBuilder::new()
        .conflict_policy("prefer_remote")
        .conflict_rule("two.txt", "prefer_local")
        .delete_physically(true)
        .build();
    let runner = setup.runner_from(&config);
    runner.run(&CancellationToken::new()).await.unwrap();

    let alpha = setup.store.get("alpha").unwrap();
    for file in ["one.txt", "two.txt"] {
        setup.fx.write_local(&alpha, file, "local edit");
        setup
            .fx
            .remote
            .put_document(alpha.remote_root_id(), file, b"remote edit");
    }
    runner.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(setup.fx.read_local(&alpha, "one.txt").as_deref(), Some("remote edit"));
    assert_eq!(
        setup.fx.remote.document(alpha.remote_root_id(), "two.txt").unwrap().1,
        b"local edit"
    );

    let beta = setup.store.get("beta").unwrap();
    std::fs::remove_file(setup.fx.local_path(&beta, "one.txt")).unwrap();
    runner.run(&CancellationToken::new()).await.unwrap();

    assert!(setup.fx.remote.document(beta.remote_root_id(), "one.txt").is_none());
}
