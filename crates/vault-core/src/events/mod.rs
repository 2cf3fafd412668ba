//! Event types and the push envelope.
//!
//! Every committed mutation is described by an [`EventType`] tag and a
//! JSON payload. The same pair is written to the journal (one row per
//! recipient) and, after commit, pushed to live connections wrapped in an
//! [`EventEnvelope`].

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tag identifying the shape of an event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Payload: the full node.
    NodeCreated,
    /// Payload: `{id, new_name, old_name}`.
    NodeRenamed,
    /// Payload: `{id, new_parent_id, old_parent_id}`.
    NodeMoved,
    /// Payload: `{id, parent_id}`.
    NodeTrashed,
    /// Payload: the full node.
    NodeRestored,
    /// Payload: `{purged_count, bytes_freed}`.
    TrashPurged,
    /// Payload: `{share_info, node_info}`.
    NodeSharedWithYou,
    /// Payload: `{node_id}`.
    ShareRevokedForYou,
    /// Payload: `{node_id}`.
    FavoriteAdded,
    /// Payload: `{node_id}`.
    FavoriteRemoved,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NodeCreated => "node_created",
            Self::NodeRenamed => "node_renamed",
            Self::NodeMoved => "node_moved",
            Self::NodeTrashed => "node_trashed",
            Self::NodeRestored => "node_restored",
            Self::TrashPurged => "trash_purged",
            Self::NodeSharedWithYou => "node_shared_with_you",
            Self::ShareRevokedForYou => "share_revoked_for_you",
            Self::FavoriteAdded => "favorite_added",
            Self::FavoriteRemoved => "favorite_removed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node_created" => Ok(Self::NodeCreated),
            "node_renamed" => Ok(Self::NodeRenamed),
            "node_moved" => Ok(Self::NodeMoved),
            "node_trashed" => Ok(Self::NodeTrashed),
            "node_restored" => Ok(Self::NodeRestored),
            "trash_purged" => Ok(Self::TrashPurged),
            "node_shared_with_you" => Ok(Self::NodeSharedWithYou),
            "share_revoked_for_you" => Ok(Self::ShareRevokedForYou),
            "favorite_added" => Ok(Self::FavoriteAdded),
            "favorite_removed" => Ok(Self::FavoriteRemoved),
            other => Err(AppError::validation(format!("Unknown event type: '{other}'"))),
        }
    }
}

/// Message pushed over the live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type tag.
    pub event_type: EventType,
    /// Event payload.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Create an envelope.
    pub fn new(event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Serialize to the text frame sent to clients.
    pub fn to_bytes(&self) -> Result<Bytes, AppError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
