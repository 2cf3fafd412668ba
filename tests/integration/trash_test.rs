//! Integration tests for trash, restore, and purge.

use vault_core::error::ErrorKind;
use vault_core::traits::BlobStore;
use vault_core::types::PageRequest;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_trash_hides_whole_subtree() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let docs = app.folder(&alice, None, "docs").await;
    let inner = app.folder(&alice, Some(&docs.id), "inner").await;
    let file = app.file(&alice, Some(&inner.id), "a.txt", b"abc").await;

    let count = app.services.nodes.trash(&alice, &docs.id).await.unwrap();
    assert_eq!(count, 3);
    assert!(app.child_names(&alice, None).await.is_empty());

    for id in [&docs.id, &inner.id, &file.id] {
        let err = app.services.nodes.get_node(&alice, id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    // Only the batch root is listed.
    let trash = app.services.trash.list_trash(&alice, Default::default()).await.unwrap();
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].id, docs.id);
}

#[tokio::test]
async fn test_restore_round_trip() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let home = app.folder(&alice, None, "home").await;
    let docs = app.folder(&alice, Some(&home.id), "docs").await;
    let file = app.file(&alice, Some(&docs.id), "a.txt", b"abc").await;

    app.services.nodes.trash(&alice, &docs.id).await.unwrap();
    let restored = app.services.trash.restore(&alice, &docs.id).await.unwrap();

    assert_eq!(restored.parent_id.as_deref(), Some(home.id.as_str()));
    assert!(restored.deleted_at.is_none());
    assert_eq!(app.child_names(&alice, Some(&docs.id)).await, vec!["a.txt"]);
    assert!(app.services.nodes.get_node(&alice, &file.id).await.is_ok());
    assert!(app.services.trash.list_trash(&alice, Default::default()).await.unwrap().is_empty());

    let types: Vec<String> = app
        .events(&alice)
        .await
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(&types[types.len() - 2..], ["node_trashed", "node_restored"]);
}

#[tokio::test]
async fn test_restore_falls_back_to_root_when_parent_is_gone() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let parent = app.folder(&alice, None, "parent").await;
    let child = app.folder(&alice, Some(&parent.id), "child").await;

    app.services.nodes.trash(&alice, &child.id).await.unwrap();
    app.services.nodes.trash(&alice, &parent.id).await.unwrap();

    let restored = app.services.trash.restore(&alice, &child.id).await.unwrap();
    assert_eq!(restored.parent_id, None);
    assert_eq!(app.child_names(&alice, None).await, vec!["child"]);

    // The parent is still in the trash, on its own.
    let trash = app.services.trash.list_trash(&alice, Default::default()).await.unwrap();
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].id, parent.id);
}

#[tokio::test]
async fn test_restore_conflict_leaves_batch_in_trash() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let old = app.folder(&alice, None, "report").await;
    app.folder(&alice, Some(&old.id), "draft").await;
    app.services.nodes.trash(&alice, &old.id).await.unwrap();
    app.folder(&alice, None, "report").await;

    let err = app.services.trash.restore(&alice, &old.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let trash = app.services.trash.list_trash(&alice, Default::default()).await.unwrap();
    assert_eq!(trash.len(), 1);
    assert_eq!(trash[0].id, old.id);
}

#[tokio::test]
async fn test_restore_is_owner_only() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;

    let docs = app.folder(&alice, None, "docs").await;
    app.services.nodes.trash(&alice, &docs.id).await.unwrap();

    let err = app.services.trash.restore(&bob, &docs.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(app.services.trash.list_trash(&bob, Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_purge_frees_quota_and_blobs() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user("alice").await;

    let docs = app.folder(&alice, None, "docs").await;
    let purged = app.file(&alice, Some(&docs.id), "a.bin", b"0123456789").await;
    let kept = app.file(&alice, None, "kept.bin", b"01234").await;
    assert_eq!(app.blob_count(), 2);

    let used = app.services.users.find_by_username(&user.username).await.unwrap();
    assert_eq!(used.storage_used_bytes, 15);

    app.services.nodes.trash(&alice, &docs.id).await.unwrap();
    let outcome = app.services.trash.purge(&alice).await.unwrap();
    assert_eq!(outcome.purged_count, 2);
    assert_eq!(outcome.bytes_freed, 10);

    assert_eq!(app.blob_count(), 1);
    assert!(!app.blobs.exists(&purged.id).await.unwrap());
    assert!(app.blobs.exists(&kept.id).await.unwrap());
    assert!(app.services.trash.list_trash(&alice, Default::default()).await.unwrap().is_empty());
    let after = app.services.users.find_by_username(&user.username).await.unwrap();
    assert_eq!(after.storage_used_bytes, 5);
    assert!(app.services.nodes.get_node(&alice, &kept.id).await.is_ok());

    let last = app.events(&alice).await.pop().unwrap();
    assert_eq!(last.event_type, "trash_purged");
    assert_eq!(last.payload["purged_count"], 2);
}

#[tokio::test]
async fn test_empty_purge_journals_nothing() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let outcome = app.services.trash.purge(&alice).await.unwrap();
    assert_eq!(outcome.purged_count, 0);
    assert!(app.events(&alice).await.is_empty());
}

#[tokio::test]
async fn test_trash_listing_is_paged() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    for name in ["a", "b", "c"] {
        let folder = app.folder(&alice, None, name).await;
        app.services.nodes.trash(&alice, &folder.id).await.unwrap();
    }

    let trash = &app.services.trash;
    assert_eq!(trash.list_trash(&alice, PageRequest::new(1, 2)).await.unwrap().len(), 2);
    assert_eq!(trash.list_trash(&alice, PageRequest::new(2, 2)).await.unwrap().len(), 1);
    assert!(trash.list_trash(&alice, PageRequest::new(3, 2)).await.unwrap().is_empty());
}
