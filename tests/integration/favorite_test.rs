//! Integration tests for favorites.

use vault_core::error::ErrorKind;
use vault_entity::share::Permission;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_add_list_remove() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let b = app.folder(&alice, None, "b").await;
    let a = app.file(&alice, Some(&b.id), "a.txt", b"hi").await;

    app.services.favorites.add(&alice, &b.id).await.unwrap();
    app.services.favorites.add(&alice, &a.id).await.unwrap();

    let names: Vec<_> = app
        .services
        .favorites
        .list(&alice, Default::default())
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(names, vec!["a.txt", "b"]);

    let err = app.services.favorites.add(&alice, &b.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    app.services.favorites.remove(&alice, &b.id).await.unwrap();
    let err = app.services.favorites.remove(&alice, &b.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let types: Vec<_> = app
        .events(&alice)
        .await
        .into_iter()
        .map(|e| e.event_type)
        .filter(|t| t.starts_with("favorite"))
        .collect();
    assert_eq!(
        types,
        vec!["favorite_added", "favorite_added", "favorite_removed"]
    );
}

#[tokio::test]
async fn test_favorite_requires_read_access() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;

    let docs = app.folder(&alice, None, "docs").await;

    let err = app.services.favorites.add(&bob, &docs.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    app.services
        .shares
        .share(&alice, &docs.id, "bob", Permission::Read)
        .await
        .unwrap();
    app.services.favorites.add(&bob, &docs.id).await.unwrap();
    assert_eq!(app.services.favorites.list(&bob, Default::default()).await.unwrap().len(), 1);
    assert!(app.services.favorites.list(&alice, Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_trashed_favorites_are_hidden() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let old = app.folder(&alice, None, "old").await;
    app.services.favorites.add(&alice, &old.id).await.unwrap();

    app.services.nodes.trash(&alice, &old.id).await.unwrap();
    assert!(app.services.favorites.list(&alice, Default::default()).await.unwrap().is_empty());
}
