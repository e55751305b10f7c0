//! Link-level reconciliation: first sync, steady state, edits and directions

use docsync_core::domain::{ReasonCode, Selection, SyncStatus::*};

use crate::common::{outcome, Fixture};

/// Local: a.txt, b.txt, docs/c.txt. Remote: r.txt, s.txt.
fn seeded(fx: &Fixture, name: &str) -> docsync_core::domain::Link {
    let link = fx.add_link(name);
    fx.write_local(&link, "a.txt", "alpha");
    fx.write_local(&link, "b.txt", "bravo");
    fx.write_local(&link, "docs/c.txt", "charlie");
    fx.remote.put_document(link.remote_root_id(), "r.txt", b"romeo");
    fx.remote.put_document(link.remote_root_id(), "s.txt", b"sierra");
    link
}

#[tokio::test]
async fn test_first_sync_copies_both_ways() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    let root = link.remote_root_id();

    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(entry.name, "work");
    assert_eq!(outcome(&entry, "docs"), (Synced, Added));
    assert_eq!(outcome(&entry, "docs/c.txt"), (Synced, Synced));
    assert_eq!(outcome(&entry, "a.txt"), (Synced, Synced));
    assert_eq!(outcome(&entry, "r.txt"), (Synced, Synced));

    let docs = fx.remote.subfolder(root, "docs").expect("remote folder created");
    assert_eq!(fx.remote.document(docs, "c.txt").unwrap().1, b"charlie");
    assert_eq!(fx.remote.document(root, "a.txt").unwrap().0, 1);
    assert_eq!(fx.read_local(&link, "s.txt").as_deref(), Some("sierra"));
    assert_eq!(fx.remote.uploads(), 3);
    assert_eq!(fx.remote.downloads(), 2);
}

#[tokio::test]
async fn test_second_sync_reports_no_changes() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.sync(&mut link, "ask", false).await;

    let entry = fx.sync(&mut link, "ask", false).await;

    for row in entry.flatten() {
        assert_eq!((row.local, row.remote), (NoChanges, NoChanges), "at '{}'", row.path);
    }
    assert_eq!(entry.entry_count(), 7);
    assert_eq!(fx.remote.uploads(), 3);
    assert_eq!(fx.remote.downloads(), 2);
}

#[tokio::test]
async fn test_local_edit_is_pushed_with_new_version() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.sync(&mut link, "ask", false).await;

    fx.write_local(&link, "a.txt", "alpha v2");
    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "a.txt"), (Synced, Synced));
    let (version, content) = fx.remote.document(link.remote_root_id(), "a.txt").unwrap();
    assert_eq!((version, content.as_slice()), (2, b"alpha v2".as_slice()));
    let remote_a = link.remote_tree().file("a.txt").unwrap();
    assert_eq!(remote_a.state().last_synced_version, Some(2));
    assert_eq!(outcome(&entry, "b.txt"), (NoChanges, NoChanges));
}

#[tokio::test]
async fn test_touched_but_identical_file_keeps_remote_version() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.sync(&mut link, "ask", false).await;

    fx.write_local(&link, "b.txt", "bravo");
    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "b.txt"), (Synced, NoChanges));
    assert_eq!(fx.remote.document(link.remote_root_id(), "b.txt").unwrap().0, 1);
}

#[tokio::test]
async fn test_remote_edit_is_pulled() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.sync(&mut link, "ask", false).await;

    fx.remote.put_document(link.remote_root_id(), "r.txt", b"romeo v2");
    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "r.txt"), (Synced, NoChanges));
    assert_eq!(fx.read_local(&link, "r.txt").as_deref(), Some("romeo v2"));
}

#[tokio::test]
async fn test_two_sided_edit_prefer_remote_overwrites_local() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.sync(&mut link, "ask", false).await;

    fx.write_local(&link, "a.txt", "local edit");
    fx.remote.put_document(link.remote_root_id(), "a.txt", b"remote edit");
    let entry = fx.sync(&mut link, "prefer_remote", false).await;

    assert_eq!(outcome(&entry, "a.txt"), (Synced, NoChanges));
    assert_eq!(fx.read_local(&link, "a.txt").as_deref(), Some("remote edit"));

    let local_a = link.local_tree().file("a.txt").unwrap();
    assert_eq!(local_a.state().last_synced_at, local_a.state().observed_at);

    let entry = fx.sync(&mut link, "prefer_remote", false).await;
    assert_eq!(outcome(&entry, "a.txt"), (NoChanges, NoChanges));
}

#[tokio::test]
async fn test_two_sided_edit_without_provider_is_reported() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.sync(&mut link, "ask", false).await;

    fx.write_local(&link, "a.txt", "local edit");
    fx.remote.put_document(link.remote_root_id(), "a.txt", b"remote edit");
    let entry = fx.sync(&mut link, "ask", false).await;

    let node = entry.find("a.txt").unwrap();
    assert_eq!((node.local, node.remote), (Error, Error));
    assert_eq!(node.reason, Some(ReasonCode::DecisionUnavailable));
    assert_eq!(fx.read_local(&link, "a.txt").as_deref(), Some("local edit"));
}

#[tokio::test]
async fn test_forbidden_extension_is_excluded() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.write_local(&link, "setup.exe", "MZ");

    let entry = fx.sync(&mut link, "ask", false).await;

    let node = entry.find("setup.exe").unwrap();
    assert_eq!((node.local, node.remote), (Error, NotExisting));
    assert_eq!(node.reason, Some(ReasonCode::ForbiddenExtension));
    assert_eq!(
        link.local_tree().file("setup.exe").unwrap().selection(),
        Selection::Exclude
    );
    assert!(fx.remote.document(link.remote_root_id(), "setup.exe").is_none());

    let entry = fx.sync(&mut link, "ask", false).await;
    assert_eq!(outcome(&entry, "setup.exe"), (NotSynced, NotExisting));
}

#[tokio::test]
async fn test_failed_folder_listing_marks_only_that_folder() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.sync(&mut link, "ask", false).await;

    fx.local.fail_listing(fx.local_path(&link, "docs"));
    fx.write_local(&link, "docs/c.txt", "charlie v2");
    let entry = fx.sync(&mut link, "ask", false).await;

    let docs = entry.find("docs").unwrap();
    assert_eq!((docs.local, docs.remote), (Error, NoChanges));
    assert_eq!(docs.reason, Some(ReasonCode::TransportError));
    assert!(docs.children.is_empty());
    assert_eq!(outcome(&entry, "a.txt"), (NoChanges, NoChanges));
    assert!(link.local_tree().folder("docs").unwrap().file("c.txt").is_some());
}

#[tokio::test]
async fn test_both_roots_failing_fails_the_link() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.local.fail_listing(link.local_root().clone());
    fx.remote.fail_listing(link.remote_root_id());

    let session = docsync_conflict::ConflictSession::new(
        std::sync::Arc::new(docsync_conflict::PolicyEngine::default()),
        None,
    );
    let mut ctx = docsync_sync::SyncContext::new(session, false);
    let result = fx.engine().sync_link(&mut link, &mut ctx).await;

    let err = result.unwrap_err();
    assert_eq!(err.reason(), ReasonCode::TransportError);
}

#[tokio::test]
async fn test_upload_only_never_downloads() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    link.set_directions(true, false);

    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "a.txt"), (Synced, Synced));
    assert_eq!(outcome(&entry, "r.txt"), (NotExisting, NotSynced));
    assert!(fx.read_local(&link, "r.txt").is_none());
    assert_eq!(fx.remote.downloads(), 0);
}

#[tokio::test]
async fn test_download_only_never_uploads() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    link.set_directions(false, true);

    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "r.txt"), (Synced, Synced));
    assert_eq!(outcome(&entry, "a.txt"), (NotSynced, NotExisting));
    assert_eq!(outcome(&entry, "docs"), (NotSynced, NotExisting));
    assert_eq!(fx.remote.uploads(), 0);
}

#[tokio::test]
async fn test_disabled_link_transfers_nothing() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    link.set_directions(false, false);

    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!((entry.local, entry.remote), (NotSynced, NotSynced));
    assert!(entry.children.is_empty());
    assert_eq!(fx.remote.uploads() + fx.remote.downloads(), 0);
}

#[tokio::test]
async fn test_excluded_folder_is_left_alone() {
    let fx = Fixture::new();
    let mut link = seeded(&fx, "work");
    fx.sync(&mut link, "ask", false).await;

    docsync_core::domain::apply_selection(link.local_tree_mut(), "docs", Selection::Exclude)
        .unwrap();
    docsync_core::domain::apply_selection(link.remote_tree_mut(), "docs", Selection::Exclude)
        .unwrap();
    fx.write_local(&link, "docs/c.txt", "charlie v2");
    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "docs"), (NotSynced, NotSynced));
    let docs = fx.remote.subfolder(link.remote_root_id(), "docs").unwrap();
    assert_eq!(fx.remote.document(docs, "c.txt").unwrap().1, b"charlie");
}

#[tokio::test]
async fn test_empty_folder_next_to_single_file_keeps_syncing() {
    let fx = Fixture::new();
    let mut link = fx.add_link("work");
    fx.write_local(&link, "docs/a.txt", "alpha");
    std::fs::create_dir_all(fx.local_path(&link, "images")).unwrap();

    fx.sync(&mut link, "ask", false).await;

    let images = link.local_tree().folder("images").unwrap();
    assert_eq!(images.selection(), Selection::Include);

    fx.write_local(&link, "images/photo.png", "pixels");
    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "images/photo.png"), (Synced, Synced));
    let remote_images = fx.remote.subfolder(link.remote_root_id(), "images").unwrap();
    assert_eq!(fx.remote.document(remote_images, "photo.png").unwrap().1, b"pixels");
}
