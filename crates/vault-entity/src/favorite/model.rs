//! Favorite entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A (user, node) marker. Removed together with either side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Favorite {
    /// The user who marked the node.
    pub user_id: i64,
    /// The marked node.
    pub node_id: String,
    /// When the marker was added.
    pub created_at: DateTime<Utc>,
}
