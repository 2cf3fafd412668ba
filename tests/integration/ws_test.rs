//! Integration tests for the WebSocket push endpoint.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use vault_core::events::EventEnvelope;
use vault_realtime::{WsState, ws_router};

use crate::helpers::TestApp;

async fn serve(app: &TestApp) -> String {
    let state = WsState {
        hub: Arc::clone(&app.hub),
        verifier: app.services.verifier.clone(),
        ping_interval: Duration::from_secs(30),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, ws_router(state)).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

async fn wait_for_connections(app: &TestApp, user_id: i64, expected: usize) {
    for _ in 0..100 {
        if app.hub.connection_count(user_id) == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {expected} connections for user {user_id}");
}

#[tokio::test]
async fn test_push_arrives_over_websocket() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user("alice").await;
    let session = app
        .services
        .sessions
        .create(user.id, "ws-test", "127.0.0.1")
        .await
        .unwrap();
    let url = serve(&app).await;

    let (mut socket, _) = connect_async(format!("{url}?token={}", session.refresh_token))
        .await
        .unwrap();
    wait_for_connections(&app, user.id, 1).await;

    let docs = app.folder(&alice, None, "docs").await;

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("push should arrive")
        .unwrap()
        .unwrap();
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {frame:?}");
    };
    let pushed: EventEnvelope = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(pushed.event_type.as_str(), "node_created");
    assert_eq!(pushed.payload["id"], docs.id.as_str());

    socket.close(None).await.unwrap();
    wait_for_connections(&app, user.id, 0).await;
}

#[tokio::test]
async fn test_bearer_header_handshake() {
    let app = TestApp::new().await;
    let (user, _) = app.create_user("alice").await;
    let session = app
        .services
        .sessions
        .create(user.id, "ws-test", "127.0.0.1")
        .await
        .unwrap();
    let url = serve(&app).await;

    let mut request = url.into_client_request().unwrap();
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {}", session.refresh_token).parse().unwrap(),
    );
    let (mut socket, _) = connect_async(request).await.unwrap();
    wait_for_connections(&app, user.id, 1).await;

    socket.close(None).await.unwrap();
    wait_for_connections(&app, user.id, 0).await;
}

#[tokio::test]
async fn test_bad_token_is_refused_before_upgrade() {
    let app = TestApp::new().await;
    let url = serve(&app).await;

    let err = connect_async(format!("{url}?token=bogus")).await.unwrap_err();
    match err {
        WsError::Http(response) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected an HTTP rejection, got {other}"),
    }
    assert_eq!(app.hub.total_connections(), 0);
}

#[tokio::test]
async fn test_revoke_all_closes_the_socket() {
    let app = TestApp::new().await;
    let (user, alice) = app.create_user("alice").await;
    let session = app
        .services
        .sessions
        .create(user.id, "ws-test", "127.0.0.1")
        .await
        .unwrap();
    let url = serve(&app).await;

    let (mut socket, _) = connect_async(format!("{url}?token={}", session.refresh_token))
        .await
        .unwrap();
    wait_for_connections(&app, user.id, 1).await;

    app.services.sessions.revoke_all(&alice).await.unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("close should arrive");
    assert!(matches!(frame, Some(Ok(Message::Close(_))) | None));
}
