//! Integration tests for uploads, quota, and downloads.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::oneshot;

use vault_core::error::ErrorKind;
use vault_entity::share::Permission;
use vault_service::UploadFile;

use crate::helpers::{TestApp, read_all};

fn upload(name: &str, content: &'static [u8]) -> UploadFile {
    UploadFile::new(name, None, Bytes::from_static(content))
}

#[tokio::test]
async fn test_upload_charges_quota_and_round_trips_content() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user("alice").await;

    let outcome = app
        .services
        .uploads
        .upload(
            &alice,
            None,
            vec![upload("a.txt", b"hello"), upload("b.png", b"\x89PNG")],
        )
        .await
        .unwrap();
    assert_eq!(outcome.created.len(), 2);
    assert!(outcome.failed.is_empty());

    let png = &outcome.created[1];
    assert_eq!(png.mime_type.as_deref(), Some("image/png"));
    assert_eq!(png.size_bytes, Some(4));

    let refreshed = app.services.users.find_by_username(&user.username).await.unwrap();
    assert_eq!(refreshed.storage_used_bytes, 9);

    let (node, content) = app
        .services
        .downloads
        .open_file(&alice, &outcome.created[0].id)
        .await
        .unwrap();
    assert_eq!(node.name, "a.txt");
    assert_eq!(read_all(content).await, b"hello");
}

#[tokio::test]
async fn test_quota_is_checked_before_any_blob_is_written() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user_with_quota("alice", 10).await;

    let err = app
        .services
        .uploads
        .upload(
            &alice,
            None,
            vec![upload("a.bin", b"012345"), upload("b.bin", b"012345")],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);

    assert_eq!(app.blob_count(), 0);
    assert!(app.child_names(&alice, None).await.is_empty());
    let refreshed = app.services.users.find_by_username(&user.username).await.unwrap();
    assert_eq!(refreshed.storage_used_bytes, 0);
    assert!(app.events(&alice).await.is_empty());
}

#[tokio::test]
async fn test_failed_file_does_not_sink_the_batch() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let outcome = app
        .services
        .uploads
        .upload(
            &alice,
            None,
            vec![
                upload("same.txt", b"one"),
                upload("same.txt", b"two"),
                upload("bad/name", b"three"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.failed.len(), 2);
    assert_eq!(outcome.failed[0].kind, ErrorKind::Conflict);
    assert_eq!(outcome.failed[1].kind, ErrorKind::Validation);

    // The conflicting file's blob was cleaned up.
    assert_eq!(app.blob_count(), 1);
    // Only the stored file keeps its share of the reservation.
    assert_eq!(app.storage_used("alice").await, 3);
}

#[tokio::test]
async fn test_folder_trashed_during_upload_gets_no_live_children() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let inbox = app.folder(&alice, None, "inbox").await;

    let nodes = Arc::clone(&app.services.nodes);
    let (ctx, inbox_id) = (alice.clone(), inbox.id.clone());
    app.during_next_save(async move {
        nodes.trash(&ctx, &inbox_id).await.unwrap();
    });

    let outcome = app
        .services
        .uploads
        .upload(&alice, Some(&inbox.id), vec![upload("late.txt", b"hello")])
        .await
        .unwrap();
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].kind, ErrorKind::NotFound);

    assert_eq!(app.blob_count(), 0);
    assert_eq!(app.storage_used("alice").await, 0);

    let purged = app.services.trash.purge(&alice).await.unwrap();
    assert_eq!(purged.purged_count, 1);
}

#[tokio::test]
async fn test_share_revoked_during_upload_stops_the_write() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;

    let inbox = app.folder(&alice, None, "inbox").await;
    let share = app
        .services
        .shares
        .share(&alice, &inbox.id, "bob", Permission::Write)
        .await
        .unwrap();

    let shares = Arc::clone(&app.services.shares);
    let owner = alice.clone();
    app.during_next_save(async move {
        shares.revoke(&owner, share.id).await.unwrap();
    });

    let outcome = app
        .services
        .uploads
        .upload(&bob, Some(&inbox.id), vec![upload("scan.pdf", b"%PDF-1.7")])
        .await
        .unwrap();
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.failed[0].kind, ErrorKind::NotFound);
    assert!(app.child_names(&alice, Some(&inbox.id)).await.is_empty());
    assert_eq!(app.storage_used("alice").await, 0);
}

#[tokio::test]
async fn test_overlapping_batches_never_exceed_quota() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user_with_quota("alice", 10).await;

    let uploads = Arc::clone(&app.services.uploads);
    let ctx = alice.clone();
    let (done_tx, done_rx) = oneshot::channel();
    app.during_next_save(async move {
        let inner = uploads
            .upload(&ctx, None, vec![upload("inner.bin", b"01234567")])
            .await;
        let _ = done_tx.send(inner);
    });

    let outer = app
        .services
        .uploads
        .upload(&alice, None, vec![upload("outer.bin", b"01234567")])
        .await
        .unwrap();
    assert_eq!(outer.created.len(), 1);

    let inner = done_rx.await.unwrap();
    let err = inner.err().expect("second batch must not fit");
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);

    assert_eq!(app.storage_used("alice").await, 8);
    assert_eq!(app.child_names(&alice, None).await, vec!["outer.bin"]);
}

#[tokio::test]
async fn test_upload_into_shared_folder_charges_owner() {
    let app = TestApp::new().await;
    let (alice_user, alice) = app.create_user("alice").await;
    let (bob_user, bob) = app.create_user("bob").await;

    let inbox = app.folder(&alice, None, "inbox").await;
    app.services
        .shares
        .share(&alice, &inbox.id, "bob", Permission::Write)
        .await
        .unwrap();

    let outcome = app
        .services
        .uploads
        .upload(&bob, Some(&inbox.id), vec![upload("scan.pdf", b"%PDF-1.7")])
        .await
        .unwrap();
    assert_eq!(outcome.created[0].owner_id, alice_user.id);

    let alice_after = app.services.users.find_by_username("alice").await.unwrap();
    let bob_after = app.services.users.find_by_username(&bob_user.username).await.unwrap();
    assert_eq!(alice_after.storage_used_bytes, 8);
    assert_eq!(bob_after.storage_used_bytes, 0);
}

#[tokio::test]
async fn test_read_only_recipient_cannot_upload() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;

    let inbox = app.folder(&alice, None, "inbox").await;
    app.services
        .shares
        .share(&alice, &inbox.id, "bob", Permission::Read)
        .await
        .unwrap();

    let err = app
        .services
        .uploads
        .upload(&bob, Some(&inbox.id), vec![upload("x.txt", b"x")])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    assert_eq!(app.blob_count(), 0);
}

#[tokio::test]
async fn test_download_rules() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, eve) = app.create_user("eve").await;

    let folder = app.folder(&alice, None, "folder").await;
    let file = app.file(&alice, None, "a.txt", b"a").await;

    let err = app
        .services
        .downloads
        .open_file(&alice, &folder.id)
        .await
        .err()
        .expect("folders have no content");
    assert_eq!(err.kind, ErrorKind::InvalidOperation);

    let err = app
        .services
        .downloads
        .open_file(&eve, &file.id)
        .await
        .err()
        .expect("stranger must not read the file");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    let err = app
        .services
        .uploads
        .upload(&alice, None, Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}
