//! Integration tests for journal reads and hub fan-out through the
//! services.

use tokio::sync::mpsc::error::TryRecvError;

use vault_core::config::RealtimeConfig;
use vault_core::error::ErrorKind;
use vault_core::events::EventEnvelope;
use vault_entity::share::Permission;

use crate::helpers::{TestApp, test_config};

fn envelope(payload: bytes::Bytes) -> EventEnvelope {
    serde_json::from_slice(&payload).expect("push payload should be an envelope")
}

#[tokio::test]
async fn test_every_connection_of_a_user_receives_the_push() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user("alice").await;

    let (_, mut laptop) = app.hub.register(user.id, "alice").unwrap();
    let (_, mut phone) = app.hub.register(user.id, "alice").unwrap();

    let docs = app.folder(&alice, None, "docs").await;

    for rx in [&mut laptop, &mut phone] {
        let pushed = envelope(rx.try_recv().unwrap());
        assert_eq!(pushed.event_type.as_str(), "node_created");
        assert_eq!(pushed.payload["id"], docs.id.as_str());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}

#[tokio::test]
async fn test_push_reaches_share_recipient_only() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (bob_user, _) = app.create_user("bob").await;
    let (carol_user, _) = app.create_user("carol").await;

    let (_, mut bob_rx) = app.hub.register(bob_user.id, "bob").unwrap();
    let (_, mut carol_rx) = app.hub.register(carol_user.id, "carol").unwrap();

    let team = app.folder(&alice, None, "team").await;
    app.services
        .shares
        .share(&alice, &team.id, "bob", Permission::Read)
        .await
        .unwrap();

    let pushed = envelope(bob_rx.try_recv().unwrap());
    assert_eq!(pushed.event_type.as_str(), "node_shared_with_you");
    assert_eq!(pushed.payload["node_info"]["id"], team.id.as_str());
    assert_eq!(pushed.payload["share_info"]["permissions"], "read");
    assert!(matches!(carol_rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_failed_mutation_pushes_nothing() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user("alice").await;
    app.folder(&alice, None, "docs").await;

    let (_, mut rx) = app.hub.register(user.id, "alice").unwrap();
    let err = app
        .services
        .nodes
        .create_folder(&alice, None, "docs")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(app.events(&alice).await.len(), 1);
}

#[tokio::test]
async fn test_journal_pages_are_capped() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    for i in 0..105 {
        app.folder(&alice, None, &format!("f{i:03}")).await;
    }

    let first = app.services.journal.events_since(&alice, 0).await.unwrap();
    assert_eq!(first.len(), 100);
    assert!(first.windows(2).all(|w| w[0].id < w[1].id));

    let rest = app
        .services
        .journal
        .events_since(&alice, first.last().unwrap().id)
        .await
        .unwrap();
    assert_eq!(rest.len(), 5);

    let oversized = app
        .services
        .journal
        .read_since(alice.user_id, 0, 1_000)
        .await
        .unwrap();
    assert_eq!(oversized.len(), 100);
}

#[tokio::test]
async fn test_journal_is_private_per_user() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;

    app.folder(&alice, None, "mine").await;
    assert_eq!(app.events(&alice).await.len(), 1);
    assert!(app.events(&bob).await.is_empty());
}

#[tokio::test]
async fn test_oversized_payload_aborts_the_mutation() {
    let mut config = test_config();
    config.journal.max_payload_bytes = 256;
    let app = TestApp::with_config(config).await;
    let (_, alice) = app.create_user("alice").await;

    let long_name = "n".repeat(400);
    let err = app
        .services
        .nodes
        .create_folder(&alice, None, &long_name)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert!(app.child_names(&alice, None).await.is_empty());
    assert!(app.events(&alice).await.is_empty());
}

#[tokio::test]
async fn test_prune_before_drops_old_events() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;

    app.folder(&alice, None, "old").await;
    let cutoff = chrono::Utc::now() + chrono::Duration::seconds(1);

    let removed = app.services.journal.prune_before(cutoff).await.unwrap();
    assert_eq!(removed, 1);
    assert!(app.events(&alice).await.is_empty());

    // Retention is off by default.
    assert_eq!(app.services.journal.prune_expired().await.unwrap(), None);
}

#[tokio::test]
async fn test_connection_cap_and_revoke_all_disconnect() {
    let mut config = test_config();
    config.realtime = RealtimeConfig {
        max_connections_per_user: 2,
        ..RealtimeConfig::default()
    };
    let app = TestApp::with_config(config).await;
    let (user, alice) = app.create_user("alice").await;

    let (_, mut first) = app.hub.register(user.id, "alice").unwrap();
    let (_, mut second) = app.hub.register(user.id, "alice").unwrap();
    let err = app.hub.register(user.id, "alice").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    app.services.sessions.create(user.id, "test", "127.0.0.1").await.unwrap();
    let removed = app.services.sessions.revoke_all(&alice).await.unwrap();
    assert_eq!(removed, 1);

    assert!(first.recv().await.is_none());
    assert!(second.recv().await.is_none());
    assert_eq!(app.hub.connection_count(user.id), 0);
}
