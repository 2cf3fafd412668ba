//! Integration tests for the streamed subtree walk.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use vault_core::error::ErrorKind;
use vault_entity::share::Permission;

use crate::helpers::{TestApp, read_all};

#[tokio::test]
async fn test_walk_is_depth_first_with_paths() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let root = app.folder(&alice, None, "project").await;
    let src = app.folder(&alice, Some(&root.id), "src").await;
    app.file(&alice, Some(&src.id), "main.rs", b"fn main() {}").await;
    app.folder(&alice, Some(&root.id), "tests").await;
    app.file(&alice, Some(&root.id), "README.md", b"# project").await;

    let entries: Vec<_> = app
        .services
        .downloads
        .walk_subtree(&alice, &root.id, CancellationToken::new())
        .collect()
        .await;
    let paths: Vec<String> = entries
        .into_iter()
        .map(|e| e.unwrap().path)
        .collect();

    assert_eq!(
        paths,
        [
            "project",
            "project/src",
            "project/src/main.rs",
            "project/tests",
            "project/README.md",
        ]
    );
}

#[tokio::test]
async fn test_walk_entries_open_their_content() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;

    let root = app.folder(&alice, None, "shared").await;
    app.file(&alice, Some(&root.id), "note.txt", b"hello bob").await;
    app.services
        .shares
        .share(&alice, &root.id, "bob", Permission::Read)
        .await
        .unwrap();

    let mut walk = app
        .services
        .downloads
        .walk_subtree(&bob, &root.id, CancellationToken::new());
    let folder = walk.next().await.unwrap().unwrap();
    assert!(app.services.downloads.open_entry(&folder).await.is_err());

    let file = walk.next().await.unwrap().unwrap();
    let content = app.services.downloads.open_entry(&file).await.unwrap();
    assert_eq!(read_all(content).await, b"hello bob");
    assert!(walk.next().await.is_none());
}

#[tokio::test]
async fn test_cancelled_walk_stops_with_cancelled() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let root = app.folder(&alice, None, "big").await;
    for i in 0..5 {
        let sub = app.folder(&alice, Some(&root.id), &format!("d{i}")).await;
        app.file(&alice, Some(&sub.id), "x.bin", b"x").await;
    }

    let cancel = CancellationToken::new();
    let mut walk = app
        .services
        .downloads
        .walk_subtree(&alice, &root.id, cancel.clone());

    assert!(walk.next().await.unwrap().is_ok());
    assert!(walk.next().await.unwrap().is_ok());
    cancel.cancel();

    let err = walk.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert!(walk.next().await.is_none());
}

#[tokio::test]
async fn test_walk_of_unreadable_root_fails() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, eve) = app.create_user("eve").await;

    let root = app.folder(&alice, None, "private").await;
    let mut walk = app
        .services
        .downloads
        .walk_subtree(&eve, &root.id, CancellationToken::new());

    let err = walk.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(walk.next().await.is_none());
}
