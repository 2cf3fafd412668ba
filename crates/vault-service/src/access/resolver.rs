//! Access resolution over the ancestor chain.
//!
//! Resolution order, evaluated over one ancestor-chain query:
//! 1. Owner: the principal owns the node or any ancestor.
//! 2. Share: the principal holds a share on the node or any ancestor.
//!    Read requires any share; write requires a write share.
//!
//! Nothing is cached or materialized per node, so a grant or revoke is
//! visible to the very next check.

use serde::{Deserialize, Serialize};

use vault_core::error::AppError;
use vault_core::result::AppResult;
use vault_core::types::validate_node_id;
use vault_database::StoreTransaction;
use vault_database::store::NodeQueries;
use vault_entity::node::{AncestorLink, Node};
use vault_entity::share::Permission;

/// Where an access grant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    /// The principal owns the node or one of its ancestors.
    Owner,
    /// A share on the node or one of its ancestors.
    Share(Permission),
}

/// The principal's capabilities on one live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAccess {
    /// Owner of the node; writes happen in this owner's scope.
    pub owner_id: i64,
    /// Whether the principal may read the node.
    pub can_read: bool,
    /// Whether the principal may create, rename, move, or trash under it.
    pub can_write: bool,
    /// Strongest grant found, if any.
    pub source: Option<AccessSource>,
}

impl NodeAccess {
    /// Fold an ancestor chain (queried node first) into a decision.
    pub fn from_chain(principal_id: i64, chain: &[AncestorLink]) -> Option<Self> {
        let owner_id = chain.first()?.owner_id;
        let owned = chain.iter().any(|link| link.owner_id == principal_id);
        let share = chain
            .iter()
            .filter_map(|link| link.permission)
            .max_by_key(|p| p.can_write());

        let source = if owned {
            Some(AccessSource::Owner)
        } else {
            share.map(AccessSource::Share)
        };
        Some(Self {
            owner_id,
            can_read: source.is_some(),
            can_write: owned || share.is_some_and(|p| p.can_write()),
            source,
        })
    }
}

/// Resolve the principal's access on a node. `None` when the node is not
/// live.
pub async fn resolve(
    tx: &mut dyn StoreTransaction,
    node_id: &str,
    principal_id: i64,
) -> AppResult<Option<NodeAccess>> {
    let chain = tx.ancestor_chain(node_id, principal_id).await?;
    Ok(NodeAccess::from_chain(principal_id, &chain))
}

/// Whether the principal may read the node.
pub async fn has_read_access(
    tx: &mut dyn StoreTransaction,
    node_id: &str,
    principal_id: i64,
) -> AppResult<bool> {
    Ok(resolve(tx, node_id, principal_id)
        .await?
        .is_some_and(|a| a.can_read))
}

/// Whether the principal may write under `target`. `None` is the
/// principal's own root, which is always writable.
pub async fn has_write_access(
    tx: &mut dyn StoreTransaction,
    principal_id: i64,
    target: Option<&str>,
) -> AppResult<bool> {
    match target {
        None => Ok(true),
        Some(id) => Ok(resolve(tx, id, principal_id)
            .await?
            .is_some_and(|a| a.can_write)),
    }
}

/// Whether `node_id` is `candidate` or lies below it.
pub async fn is_descendant_of(
    tx: &mut dyn StoreTransaction,
    node_id: &str,
    candidate: &str,
) -> AppResult<bool> {
    if node_id == candidate {
        return Ok(true);
    }
    // The principal id only affects the share column, which is unused here.
    let chain = tx.ancestor_chain(node_id, 0).await?;
    Ok(chain.iter().any(|link| link.node_id == candidate))
}

/// Load a live node the principal can read. Anything else is `NotFound`.
pub async fn require_readable(
    tx: &mut dyn StoreTransaction,
    node_id: &str,
    principal_id: i64,
) -> AppResult<(Node, NodeAccess)> {
    validate_node_id(node_id)?;
    let access = resolve(tx, node_id, principal_id)
        .await?
        .filter(|a| a.can_read)
        .ok_or_else(|| AppError::not_found("Node not found"))?;
    let node = tx
        .find_live_node(node_id)
        .await?
        .ok_or_else(|| AppError::not_found("Node not found"))?;
    Ok((node, access))
}

/// Load a live node the principal can write. Unreadable nodes are
/// `NotFound`; readable ones without write access are `PermissionDenied`.
pub async fn require_writable(
    tx: &mut dyn StoreTransaction,
    node_id: &str,
    principal_id: i64,
) -> AppResult<(Node, NodeAccess)> {
    let (node, access) = require_readable(tx, node_id, principal_id).await?;
    if !access.can_write {
        return Err(AppError::permission_denied(
            "Write access to this node is required",
        ));
    }
    Ok((node, access))
}

/// Load a writable live folder to create nodes in.
pub async fn require_writable_folder(
    tx: &mut dyn StoreTransaction,
    folder_id: &str,
    principal_id: i64,
) -> AppResult<Node> {
    let (folder, _) = require_writable(tx, folder_id, principal_id).await?;
    if !folder.is_folder() {
        return Err(AppError::invalid_operation("Parent is not a folder"));
    }
    Ok(folder)
}
