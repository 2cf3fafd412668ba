//! Journal row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A journal row as returned to a poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JournalEvent {
    /// Global sequence number.
    pub id: i64,
    /// Recipient user.
    #[serde(skip_serializing)]
    pub user_id: i64,
    /// Event type tag.
    pub event_type: String,
    /// When the event was appended.
    pub event_time: DateTime<Utc>,
    /// Structured payload.
    pub payload: serde_json::Value,
}
