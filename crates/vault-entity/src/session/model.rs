//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A refresh-token-bearing login record.
///
/// Sessions are never updated: refreshing deletes the row and creates a
/// new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: i64,
    /// Opaque refresh token.
    #[serde(skip_serializing)]
    pub refresh_token: String,
    /// User-Agent header value at login.
    pub user_agent: String,
    /// Client address at login.
    pub client_ip: String,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Data required to create a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    /// Session id.
    pub id: Uuid,
    /// Owning user.
    pub user_id: i64,
    /// Opaque refresh token.
    pub refresh_token: String,
    /// User-Agent header value.
    pub user_agent: String,
    /// Client address.
    pub client_ip: String,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}
