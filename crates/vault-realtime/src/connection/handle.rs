//! A single live push connection.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// The hub's side of a connection: the sending half of its outbound queue.
///
/// Only the hub holds this, so removing it from the registry closes the
/// queue and ends the connection's writer task.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// User who owns this connection.
    pub user_id: i64,
    /// Username (cached for logs).
    pub username: String,
    /// When the connection was registered.
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Bytes>,
}

/// Outcome of a single enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The payload was queued.
    Queued,
    /// The queue was full and the payload was dropped.
    Dropped,
    /// The receiving side is gone.
    Closed,
}

impl ConnectionHandle {
    pub(crate) fn new(
        user_id: i64,
        username: String,
        sender: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            username,
            connected_at: Utc::now(),
            sender,
        }
    }

    /// Enqueue without waiting.
    pub(crate) fn try_deliver(&self, payload: Bytes) -> Delivery {
        match self.sender.try_send(payload) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Whether the receiving side is gone.
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The socket's side of a registration, returned by [`crate::Hub::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Connection ID, used to unregister.
    pub id: ConnectionId,
    /// Owning user.
    pub user_id: i64,
}
