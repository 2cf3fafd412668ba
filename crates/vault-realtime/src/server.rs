//! WebSocket push endpoint.
//!
//! `GET /ws` verifies the caller's token before upgrading, registers the
//! connection with the [`Hub`], and spawns one writer task that drains the
//! connection's outbound queue. The read loop only watches for the client
//! going away; the channel is server to client.
//!
//! The token is read from an `Authorization: Bearer` header. Browsers cannot
//! set headers on a WebSocket handshake, so a `token` query parameter is
//! accepted as a fallback.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vault_core::error::{AppError, ErrorKind};
use vault_core::traits::{Principal, PrincipalVerifier};

use crate::connection::Registration;
use crate::hub::Hub;

/// Shared state of the push endpoint.
#[derive(Clone)]
pub struct WsState {
    /// The process-wide hub.
    pub hub: Arc<Hub>,
    /// Handshake token verifier.
    pub verifier: Arc<dyn PrincipalVerifier>,
    /// Interval between keepalive pings.
    pub ping_interval: Duration,
}

impl std::fmt::Debug for WsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsState")
            .field("ping_interval", &self.ping_interval)
            .finish_non_exhaustive()
    }
}

/// Handshake query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Opaque access token, when it is not sent as a header.
    #[serde(default)]
    pub token: Option<String>,
}

/// The handshake token: the bearer header wins over the query parameter.
fn handshake_token(headers: &HeaderMap, query: WsQuery) -> Result<String, AppError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    bearer
        .or(query.token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::authentication("Missing access token"))
}

/// Error body returned when the handshake is refused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeError {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Router serving the push endpoint at `/ws`.
pub fn ws_router(state: WsState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

/// Map a refused handshake to an HTTP response.
pub fn handshake_rejection(err: &AppError) -> Response {
    let status = match err.kind {
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Conflict => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = HandshakeError {
        error: err.kind.to_string(),
        message: if err.kind.is_internal() {
            "Internal error".to_string()
        } else {
            err.message.clone()
        },
    };
    (status, Json(body)).into_response()
}

/// GET /ws
pub async fn ws_handler(
    State(state): State<WsState>,
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> Response {
    let token = match handshake_token(&headers, query) {
        Ok(token) => token,
        Err(e) => return handshake_rejection(&e),
    };
    let principal = match state.verifier.verify(&token).await {
        Ok(principal) => principal,
        Err(e) => {
            debug!(error = %e, "WebSocket handshake refused");
            return handshake_rejection(&e);
        }
    };

    let (registration, outbound) = match state.hub.register(principal.user_id, &principal.username)
    {
        Ok(registered) => registered,
        Err(e) => return handshake_rejection(&e),
    };

    let hub = Arc::clone(&state.hub);
    ws.on_failed_upgrade(move |e| {
        warn!(conn_id = %registration.id, error = %e, "WebSocket upgrade failed");
        hub.unregister(&registration);
    })
    .on_upgrade(move |socket| serve_connection(state, principal, registration, outbound, socket))
}

async fn serve_connection(
    state: WsState,
    principal: Principal,
    registration: Registration,
    outbound: mpsc::Receiver<Bytes>,
    socket: WebSocket,
) {
    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(drain_outbound(ws_tx, outbound, state.ping_interval));

    info!(
        conn_id = %registration.id,
        user_id = principal.user_id,
        "WebSocket connection established"
    );

    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %registration.id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.hub.unregister(&registration);
    writer.abort();

    info!(
        conn_id = %registration.id,
        user_id = principal.user_id,
        "WebSocket connection closed"
    );
}

/// Forward queued payloads as text frames until the hub closes the queue
/// or the socket fails.
async fn drain_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Bytes>,
    ping_interval: Duration,
) {
    let mut ping = tokio::time::interval(ping_interval.max(Duration::from_secs(1)));
    ping.tick().await;

    loop {
        tokio::select! {
            next = outbound.recv() => {
                let Some(payload) = next else {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                };
                let text = match String::from_utf8(payload.to_vec()) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Skipping non UTF-8 push payload");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}
