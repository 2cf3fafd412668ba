//! Node entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::node_type::NodeType;
use crate::share::Permission;

/// A file or folder in an owner's tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Node {
    /// Fixed-length opaque identifier.
    pub id: String,
    /// The user who owns the node (the owner of its containing folder).
    pub owner_id: i64,
    /// Parent folder (None for the owner's root, and while trashed).
    pub parent_id: Option<String>,
    /// Node name, unique among live siblings.
    pub name: String,
    /// File or folder.
    pub node_type: NodeType,
    /// Content size (files only).
    pub size_bytes: Option<i64>,
    /// Content type (files only).
    pub mime_type: Option<String>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node was last renamed or moved.
    pub modified_at: DateTime<Utc>,
    /// When the node was trashed.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Parent at the time the node was trashed.
    #[serde(skip)]
    pub original_parent_id: Option<String>,
}

impl Node {
    /// Whether the node is a folder.
    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }

    /// Whether the node is in the live tree (not trashed).
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Content size, zero for folders.
    pub fn content_bytes(&self) -> i64 {
        self.size_bytes.unwrap_or(0)
    }
}

/// Data required to insert a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNode {
    /// Pre-generated identifier.
    pub id: String,
    /// Owning user.
    pub owner_id: i64,
    /// Parent folder.
    pub parent_id: Option<String>,
    /// Node name.
    pub name: String,
    /// File or folder.
    pub node_type: NodeType,
    /// Content size (files only).
    pub size_bytes: Option<i64>,
    /// Content type (files only).
    pub mime_type: Option<String>,
}

impl NewNode {
    /// A folder insert.
    pub fn folder(
        id: impl Into<String>,
        owner_id: i64,
        parent_id: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id,
            parent_id,
            name: name.into(),
            node_type: NodeType::Folder,
            size_bytes: None,
            mime_type: None,
        }
    }

    /// A file insert. Size and content type are always set for files.
    pub fn file(
        id: impl Into<String>,
        owner_id: i64,
        parent_id: Option<String>,
        name: impl Into<String>,
        size_bytes: i64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id,
            parent_id,
            name: name.into(),
            node_type: NodeType::File,
            size_bytes: Some(size_bytes),
            mime_type: Some(mime_type.into()),
        }
    }
}

/// One step of an ancestor walk, as seen by a particular principal.
///
/// The walk starts at the queried node (depth 0) and follows parent links
/// up to the owner's root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AncestorLink {
    /// The node at this step.
    pub node_id: String,
    /// Its owner.
    pub owner_id: i64,
    /// Distance from the queried node.
    pub depth: i32,
    /// The share granted to the principal on this node, if any.
    pub permission: Option<Permission>,
}

/// Result of permanently deleting an owner's trash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    /// Ids of destroyed file nodes, whose blobs must be deleted.
    pub file_ids: Vec<String>,
    /// Sum of the destroyed files' sizes.
    pub bytes_freed: i64,
    /// Number of destroyed rows, folders included.
    pub purged_count: u64,
}
