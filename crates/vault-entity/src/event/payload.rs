//! Payload shapes for the journal and the push channel.
//!
//! `node_created` and `node_restored` carry the full [`Node`] and have no
//! dedicated struct.

use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::share::Share;

/// Payload of `node_renamed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRenamedPayload {
    pub id: String,
    pub new_name: String,
    pub old_name: String,
}

/// Payload of `node_moved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMovedPayload {
    pub id: String,
    pub new_parent_id: Option<String>,
    pub old_parent_id: Option<String>,
}

/// Payload of `node_trashed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTrashedPayload {
    pub id: String,
    pub parent_id: Option<String>,
}

/// Payload of `trash_purged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashPurgedPayload {
    pub purged_count: u64,
    pub bytes_freed: i64,
}

/// Payload of `node_shared_with_you`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSharedPayload {
    pub share_info: Share,
    pub node_info: Node,
}

/// Payload naming a single node: `share_revoked_for_you`,
/// `favorite_added`, `favorite_removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRefPayload {
    pub node_id: String,
}
