//! Integration tests for session rotation, revocation, and handshake
//! verification.

use vault_core::error::ErrorKind;
use vault_core::traits::PrincipalVerifier;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_rotation_consumes_the_old_token() {
    let app = TestApp::new().await;
    let (user, _) = app.create_user("alice").await;
    let sessions = &app.services.sessions;

    let first = sessions.create(user.id, "firefox", "10.0.0.1").await.unwrap();
    assert!(first.expires_at > first.created_at);

    let second = sessions
        .rotate(&first.refresh_token, "firefox", "10.0.0.2")
        .await
        .unwrap();
    assert_ne!(second.id, first.id);
    assert_ne!(second.refresh_token, first.refresh_token);
    assert_eq!(second.user_id, user.id);
    assert_eq!(second.client_ip, "10.0.0.2");

    let err = sessions
        .rotate(&first.refresh_token, "firefox", "10.0.0.3")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);

    let err = sessions.rotate("not-a-token", "", "").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
}

#[tokio::test]
async fn test_list_and_revoke() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user("alice").await;
    let (bob_user, bob) = app.create_user("bob").await;
    let sessions = &app.services.sessions;

    let a = sessions.create(user.id, "phone", "10.0.0.1").await.unwrap();
    sessions.create(user.id, "laptop", "10.0.0.2").await.unwrap();
    sessions.create(bob_user.id, "laptop", "10.0.0.3").await.unwrap();

    assert_eq!(sessions.list(&alice).await.unwrap().len(), 2);

    // Another user's session id is not found for bob.
    let err = sessions.revoke(&bob, a.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    sessions.revoke(&alice, a.id).await.unwrap();
    let remaining = sessions.list(&alice).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].user_agent, "laptop");

    assert_eq!(sessions.revoke_all(&alice).await.unwrap(), 1);
    assert!(sessions.list(&alice).await.unwrap().is_empty());
    assert_eq!(sessions.list(&bob).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_verifier_accepts_only_live_tokens() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user("alice").await;
    let sessions = &app.services.sessions;
    let verifier = &app.services.verifier;

    let session = sessions.create(user.id, "cli", "127.0.0.1").await.unwrap();
    let principal = verifier.verify(&session.refresh_token).await.unwrap();
    assert_eq!(principal.user_id, user.id);
    assert_eq!(principal.username, "alice");

    sessions.revoke_all(&alice).await.unwrap();
    let err = verifier.verify(&session.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);

    let err = verifier.verify("").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
}
