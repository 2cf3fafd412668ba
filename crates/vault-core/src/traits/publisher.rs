//! Post-commit push publisher.

use bytes::Bytes;

/// Best-effort delivery of a serialized event to a user's live
/// connections.
///
/// Implementations must not block and must swallow delivery failures.
/// Callers invoke it only after the transaction that produced the event
/// has committed.
pub trait Publisher: Send + Sync + 'static {
    /// Deliver `payload` to every live connection of `user_id`.
    fn publish(&self, user_id: i64, payload: Bytes);

    /// Close every live connection of `user_id`.
    fn disconnect_user(&self, _user_id: i64) {}
}

/// Publisher that discards everything, for processes without a hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, _user_id: i64, _payload: Bytes) {}
}
