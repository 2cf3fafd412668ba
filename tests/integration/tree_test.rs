//! Integration tests for node creation, naming, rename, and move.

use vault_core::error::ErrorKind;
use vault_core::types::PageRequest;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_children_list_folders_first_then_by_name() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    app.file(&alice, None, "b.txt", b"b").await;
    app.folder(&alice, None, "zeta").await;
    app.file(&alice, None, "a.txt", b"a").await;
    app.folder(&alice, None, "alpha").await;

    assert_eq!(
        app.child_names(&alice, None).await,
        vec!["alpha", "zeta", "a.txt", "b.txt"]
    );

    let second_page = app
        .services
        .nodes
        .list_children(&alice, None, PageRequest::new(2, 3))
        .await
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].name, "b.txt");
}

#[tokio::test]
async fn test_sibling_names_are_unique_per_folder() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let docs = app.folder(&alice, None, "docs").await;
    let err = app
        .services
        .nodes
        .create_folder(&alice, None, "docs")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    // Same name under a different parent is fine.
    app.folder(&alice, Some(&docs.id), "docs").await;

    // Another user's root is a separate namespace.
    let (_, bob) = app.create_user("bob").await;
    app.folder(&bob, None, "docs").await;
}

#[tokio::test]
async fn test_name_is_reusable_after_trash() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let first = app.folder(&alice, None, "notes").await;
    app.services.nodes.trash(&alice, &first.id).await.unwrap();

    let second = app.folder(&alice, None, "notes").await;
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn test_invalid_names_are_rejected() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    for name in ["", "   ", "a/b"] {
        let err = app
            .services
            .nodes
            .create_folder(&alice, None, name)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "name {name:?}");
    }

    let trimmed = app.folder(&alice, None, "  padded  ").await;
    assert_eq!(trimmed.name, "padded");
}

#[tokio::test]
async fn test_rename_checks_siblings() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let a = app.folder(&alice, None, "a").await;
    app.folder(&alice, None, "b").await;

    let err = app.services.nodes.rename(&alice, &a.id, "b").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let renamed = app.services.nodes.rename(&alice, &a.id, "c").await.unwrap();
    assert_eq!(renamed.name, "c");
    assert!(renamed.modified_at >= a.modified_at);

    let events = app.events(&alice).await;
    let last = events.last().unwrap();
    assert_eq!(last.event_type, "node_renamed");
    assert_eq!(last.payload["old_name"], "a");
    assert_eq!(last.payload["new_name"], "c");
}

#[tokio::test]
async fn test_move_refuses_cycles() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let top = app.folder(&alice, None, "top").await;
    let mid = app.folder(&alice, Some(&top.id), "mid").await;
    let leaf = app.folder(&alice, Some(&mid.id), "leaf").await;

    for dest in [&top.id, &mid.id, &leaf.id] {
        let err = app
            .services
            .nodes
            .move_node(&alice, &top.id, Some(dest))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);
    }

    // Tree unchanged.
    assert_eq!(app.child_names(&alice, None).await, vec!["top"]);
    assert_eq!(app.child_names(&alice, Some(&mid.id)).await, vec!["leaf"]);
}

#[tokio::test]
async fn test_move_between_folders_and_to_root() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let src = app.folder(&alice, None, "src").await;
    let dst = app.folder(&alice, None, "dst").await;
    let file = app.file(&alice, Some(&src.id), "report.pdf", b"%PDF").await;

    let moved = app
        .services
        .nodes
        .move_node(&alice, &file.id, Some(&dst.id))
        .await
        .unwrap();
    assert_eq!(moved.parent_id.as_deref(), Some(dst.id.as_str()));
    assert!(app.child_names(&alice, Some(&src.id)).await.is_empty());

    let at_root = app
        .services
        .nodes
        .move_node(&alice, &file.id, None)
        .await
        .unwrap();
    assert_eq!(at_root.parent_id, None);

    let events = app.events(&alice).await;
    let last = events.last().unwrap();
    assert_eq!(last.event_type, "node_moved");
    assert_eq!(last.payload["old_parent_id"], dst.id.as_str());
    assert!(last.payload["new_parent_id"].is_null());
}

#[tokio::test]
async fn test_move_into_a_file_is_refused() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let folder = app.folder(&alice, None, "folder").await;
    let file = app.file(&alice, None, "plain.txt", b"x").await;

    let err = app
        .services
        .nodes
        .move_node(&alice, &folder.id, Some(&file.id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let err = app
        .services
        .nodes
        .get_node(&alice, "AAAAAAAAAAAAAAAAAAAAA")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app.services.nodes.get_node(&alice, "short").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidOperation);
}

#[tokio::test]
async fn test_create_under_trashed_parent_is_not_found() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let gone = app.folder(&alice, None, "gone").await;
    app.services.nodes.trash(&alice, &gone.id).await.unwrap();

    let err = app
        .services
        .nodes
        .create_folder(&alice, Some(&gone.id), "child")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
