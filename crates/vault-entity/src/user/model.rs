//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered user, as far as the file engine is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Human-readable display name.
    pub display_name: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// Storage allowance in bytes.
    pub storage_quota_bytes: i64,
    /// Bytes currently held by the user's files, trash included.
    pub storage_used_bytes: i64,
}

impl User {
    /// Bytes still available under the quota.
    pub fn remaining_quota(&self) -> i64 {
        (self.storage_quota_bytes - self.storage_used_bytes).max(0)
    }

    /// Whether adding `additional` bytes would exceed the quota.
    pub fn would_exceed_quota(&self, additional: i64) -> bool {
        self.storage_used_bytes.saturating_add(additional) > self.storage_quota_bytes
    }
}

/// Data required to create a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Unique login name.
    pub username: String,
    /// Display name.
    pub display_name: Option<String>,
    /// Storage allowance in bytes.
    pub storage_quota_bytes: i64,
}
