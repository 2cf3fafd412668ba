//! Share entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::permission::Permission;
use crate::node::NodeType;

/// A directed grant of read or write access on a node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Share {
    /// Unique share identifier.
    pub id: i64,
    /// The shared node.
    pub node_id: String,
    /// The owner who granted the share.
    pub sharer_id: i64,
    /// The user receiving access.
    pub recipient_id: i64,
    /// Granted capability.
    pub permissions: Permission,
    /// When the share was created.
    pub shared_at: DateTime<Utc>,
}

/// Data required to create a share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShare {
    /// The shared node.
    pub node_id: String,
    /// The granting owner.
    pub sharer_id: i64,
    /// The receiving user.
    pub recipient_id: i64,
    /// Granted capability.
    pub permissions: Permission,
}

/// A share as listed for its sharer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OutgoingShare {
    /// Share id.
    pub id: i64,
    /// Shared node id.
    pub node_id: String,
    /// Shared node name.
    pub node_name: String,
    /// Shared node type.
    pub node_type: NodeType,
    /// Recipient id.
    pub recipient_id: i64,
    /// Recipient username.
    pub recipient_username: String,
    /// Granted capability.
    pub permissions: Permission,
    /// When the share was created.
    pub shared_at: DateTime<Utc>,
}

/// A user who has shared at least one node with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SharingUser {
    /// User id.
    pub id: i64,
    /// Username.
    pub username: String,
    /// Display name.
    pub display_name: Option<String>,
}
