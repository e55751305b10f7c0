//! Deletion policy: soft exclusion, physical deletion and its failure fallback

use docsync_core::domain::{ReasonCode, Selection, SyncStatus::*};

use crate::common::{outcome, Fixture};

async fn synced_link(fx: &Fixture) -> docsync_core::domain::Link {
    let mut link = fx.add_link("work");
    fx.write_local(&link, "a.txt", "alpha");
    fx.write_local(&link, "b.txt", "bravo");
    fx.write_local(&link, "docs/c.txt", "charlie");
    fx.write_local(&link, "docs/d.txt", "delta");
    fx.sync(&mut link, "ask", false).await;
    link
}

#[tokio::test]
async fn test_remote_folder_removed_soft_excludes_local_counterpart() {
    let fx = Fixture::new();
    let mut link = synced_link(&fx).await;
    let docs = fx.remote.subfolder(link.remote_root_id(), "docs").unwrap();

    fx.remote.remove_folder(docs);
    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "docs"), (Removed, NotExisting));
    assert_eq!(outcome(&entry, "docs/c.txt"), (Removed, NotExisting));
    let local_docs = link.local_tree().folder("docs").expect("local node kept");
    assert_eq!(local_docs.selection(), Selection::Exclude);
    assert!(local_docs.files().all(|f| f.selection() == Selection::Exclude));
    assert!(link.remote_tree().folder("docs").is_none());
    assert!(fx.local_path(&link, "docs/c.txt").exists(), "nothing deleted on disk");

    let entry = fx.sync(&mut link, "ask", false).await;
    assert_eq!(outcome(&entry, "docs"), (NotSynced, NotExisting));
}

#[tokio::test]
async fn test_local_file_removed_soft_excludes_remote_counterpart() {
    let fx = Fixture::new();
    let mut link = synced_link(&fx).await;

    std::fs::remove_file(fx.local_path(&link, "a.txt")).unwrap();
    let entry = fx.sync(&mut link, "ask", false).await;

    assert_eq!(outcome(&entry, "a.txt"), (NotExisting, Removed));
    assert_eq!(
        link.remote_tree().file("a.txt").unwrap().selection(),
        Selection::Exclude
    );
    assert!(link.local_tree().file("a.txt").is_none());
    assert!(fx.remote.document(link.remote_root_id(), "a.txt").is_some());
}

#[tokio::test]
async fn test_local_folder_removed_hard_deletes_remote_subtree() {
    let fx = Fixture::new();
    let mut link = synced_link(&fx).await;
    let docs = fx.remote.subfolder(link.remote_root_id(), "docs").unwrap();

    std::fs::remove_dir_all(fx.local_path(&link, "docs")).unwrap();
    let entry = fx.sync(&mut link, "ask", true).await;

    assert_eq!(outcome(&entry, "docs"), (NotExisting, Deleted));
    assert_eq!(outcome(&entry, "docs/c.txt"), (NotExisting, Deleted));
    assert_eq!(outcome(&entry, "docs/d.txt"), (NotExisting, Deleted));
    assert!(fx.remote.subfolder(link.remote_root_id(), "docs").is_none());
    assert!(fx.remote.document(docs, "c.txt").is_none());
    assert!(link.local_tree().folder("docs").is_none());
    assert!(link.remote_tree().folder("docs").is_none());
}

#[tokio::test]
async fn test_remote_file_removed_hard_deletes_local_file() {
    let fx = Fixture::new();
    let mut link = synced_link(&fx).await;

    fx.remote.remove_document(link.remote_root_id(), "b.txt");
    let entry = fx.sync(&mut link, "ask", true).await;

    assert_eq!(outcome(&entry, "b.txt"), (Deleted, NotExisting));
    assert!(!fx.local_path(&link, "b.txt").exists());
    assert!(link.local_tree().file("b.txt").is_none());
    assert!(link.remote_tree().file("b.txt").is_none());
}

#[tokio::test]
async fn test_refused_physical_delete_falls_back_to_exclusion() {
    let fx = Fixture::new();
    let mut link = synced_link(&fx).await;

    fx.remote.refuse_deletes(true);
    std::fs::remove_dir_all(fx.local_path(&link, "docs")).unwrap();
    let entry = fx.sync(&mut link, "ask", true).await;

    let docs = entry.find("docs").unwrap();
    assert_eq!((docs.local, docs.remote), (NotExisting, Error));
    assert_eq!(docs.reason, Some(ReasonCode::PhysicalDeleteFailure));
    let c = entry.find("docs/c.txt").unwrap();
    assert_eq!((c.local, c.remote), (NotExisting, Error));
    assert_eq!(c.reason, Some(ReasonCode::PhysicalDeleteFailure));

    let remote_docs = link.remote_tree().folder("docs").expect("counterpart kept");
    assert_eq!(remote_docs.selection(), Selection::Exclude);
    assert!(fx.remote.subfolder(link.remote_root_id(), "docs").is_some());
}

#[tokio::test]
async fn test_both_sides_gone_forgets_the_pair() {
    let fx = Fixture::new();
    let mut link = synced_link(&fx).await;
    let docs = fx.remote.subfolder(link.remote_root_id(), "docs").unwrap();

    std::fs::remove_dir_all(fx.local_path(&link, "docs")).unwrap();
    fx.remote.remove_folder(docs);
    let entry = fx.sync(&mut link, "ask", true).await;

    assert_eq!(outcome(&entry, "docs"), (NotExisting, NotExisting));
    assert!(link.local_tree().folder("docs").is_none());
    assert!(link.remote_tree().folder("docs").is_none());
}
