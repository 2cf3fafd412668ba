//! Node CRUD operations with access enforcement.

use std::sync::Arc;

use tracing::info;

use vault_core::error::AppError;
use vault_core::events::EventType;
use vault_core::result::AppResult;
use vault_core::traits::Publisher;
use vault_core::types::{PageRequest, validate_node_id};
use vault_database::Store;
use vault_database::store::NodeQueries;
use vault_entity::event::{NodeMovedPayload, NodeRenamedPayload, NodeTrashedPayload};
use vault_entity::node::{NewNode, Node};

use crate::access::resolver;
use crate::context::RequestContext;
use crate::journal::Journal;
use crate::node::naming::{allocate_node_id, validate_name};
use crate::unit_of_work::UnitOfWork;

/// Creates, renames, moves, lists, and trashes nodes.
///
/// Every mutation is authorized, applied, and journaled in one unit of
/// work; pushes go out only after it commits. Writers holding a share act
/// in the owner's scope, so nodes they create belong to the folder owner.
#[derive(Clone)]
pub struct NodeService {
    store: Arc<dyn Store>,
    publisher: Arc<dyn Publisher>,
    journal: Arc<Journal>,
}

impl std::fmt::Debug for NodeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeService").finish()
    }
}

impl NodeService {
    /// Creates a new node service.
    pub fn new(
        store: Arc<dyn Store>,
        publisher: Arc<dyn Publisher>,
        journal: Arc<Journal>,
    ) -> Self {
        Self {
            store,
            publisher,
            journal,
        }
    }

    /// A node the caller can read.
    pub async fn get_node(&self, ctx: &RequestContext, node_id: &str) -> AppResult<Node> {
        let mut tx = self.store.begin().await?;
        let (node, _) = resolver::require_readable(&mut *tx, node_id, ctx.user_id).await?;
        tx.rollback().await?;
        Ok(node)
    }

    /// Live children of `parent_id`, or of the caller's root when `None`.
    /// Folders come first, then names in order.
    pub async fn list_children(
        &self,
        ctx: &RequestContext,
        parent_id: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Vec<Node>> {
        let mut tx = self.store.begin().await?;
        let children = match parent_id {
            None => tx.list_children(ctx.user_id, None, &page).await?,
            Some(id) => {
                let (parent, _) = resolver::require_readable(&mut *tx, id, ctx.user_id).await?;
                if !parent.is_folder() {
                    return Err(AppError::invalid_operation("Node is not a folder"));
                }
                tx.list_children(parent.owner_id, Some(id), &page).await?
            }
        };
        tx.rollback().await?;
        Ok(children)
    }

    /// Create a folder under `parent_id` (the caller's root when `None`).
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        parent_id: Option<&str>,
        name: &str,
    ) -> AppResult<Node> {
        let name = validate_name(name)?;
        if let Some(id) = parent_id {
            validate_node_id(id)?;
        }

        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let owner_id = match parent_id {
            None => ctx.user_id,
            Some(id) => {
                resolver::require_writable_folder(uow.tx(), id, ctx.user_id)
                    .await?
                    .owner_id
            }
        };

        let id = allocate_node_id(uow.tx()).await?;
        let node = uow
            .tx()
            .insert_node(&NewNode::folder(
                id,
                owner_id,
                parent_id.map(str::to_string),
                name,
            ))
            .await?;

        uow.record(
            &self.journal,
            &[ctx.user_id, owner_id],
            EventType::NodeCreated,
            &node,
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;

        info!(node_id = %node.id, owner_id, user_id = ctx.user_id, "Folder created");
        Ok(node)
    }

    /// Rename a node the caller can write.
    pub async fn rename(
        &self,
        ctx: &RequestContext,
        node_id: &str,
        new_name: &str,
    ) -> AppResult<Node> {
        let new_name = validate_name(new_name)?;

        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let (node, _) = resolver::require_writable(uow.tx(), node_id, ctx.user_id).await?;

        let renamed = uow
            .tx()
            .rename_node(node_id, node.owner_id, &new_name)
            .await?
            .ok_or_else(|| AppError::not_found("Node not found"))?;

        uow.record(
            &self.journal,
            &[ctx.user_id, node.owner_id],
            EventType::NodeRenamed,
            &NodeRenamedPayload {
                id: renamed.id.clone(),
                new_name: renamed.name.clone(),
                old_name: node.name,
            },
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;

        info!(node_id, user_id = ctx.user_id, "Node renamed");
        Ok(renamed)
    }

    /// Move a node under `new_parent_id`, or to the caller's root when
    /// `None`.
    ///
    /// The destination must be a live folder the caller can write, owned by
    /// the node's owner, and must not be the node itself or one of its
    /// descendants.
    pub async fn move_node(
        &self,
        ctx: &RequestContext,
        node_id: &str,
        new_parent_id: Option<&str>,
    ) -> AppResult<Node> {
        if let Some(id) = new_parent_id {
            validate_node_id(id)?;
        }

        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let (node, _) = resolver::require_writable(uow.tx(), node_id, ctx.user_id).await?;

        match new_parent_id {
            None => {
                if node.owner_id != ctx.user_id {
                    return Err(AppError::invalid_operation(
                        "Cannot move a node into another user's root",
                    ));
                }
            }
            Some(dest) => {
                if resolver::is_descendant_of(uow.tx(), dest, node_id).await? {
                    return Err(AppError::invalid_operation(
                        "Cannot move a node into itself or one of its descendants",
                    ));
                }
                let folder = resolver::require_writable_folder(uow.tx(), dest, ctx.user_id).await?;
                if folder.owner_id != node.owner_id {
                    return Err(AppError::invalid_operation(
                        "Cannot move a node into a folder owned by another user",
                    ));
                }
            }
        }

        let moved = uow
            .tx()
            .move_node(node_id, node.owner_id, new_parent_id)
            .await?
            .ok_or_else(|| AppError::not_found("Node not found"))?;

        uow.record(
            &self.journal,
            &[ctx.user_id, node.owner_id],
            EventType::NodeMoved,
            &NodeMovedPayload {
                id: moved.id.clone(),
                new_parent_id: moved.parent_id.clone(),
                old_parent_id: node.parent_id,
            },
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;

        info!(node_id, user_id = ctx.user_id, "Node moved");
        Ok(moved)
    }

    /// Move a node and its live subtree to the owner's trash.
    /// Returns the number of nodes trashed.
    pub async fn trash(&self, ctx: &RequestContext, node_id: &str) -> AppResult<usize> {
        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let (node, _) = resolver::require_writable(uow.tx(), node_id, ctx.user_id).await?;

        let trashed = uow.tx().trash_subtree(node_id, node.owner_id).await?;
        if trashed.is_empty() {
            return Err(AppError::not_found("Node not found"));
        }

        uow.record(
            &self.journal,
            &[ctx.user_id, node.owner_id],
            EventType::NodeTrashed,
            &NodeTrashedPayload {
                id: node.id.clone(),
                parent_id: node.parent_id.clone(),
            },
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;

        info!(node_id, count = trashed.len(), user_id = ctx.user_id, "Node trashed");
        Ok(trashed.len())
    }
}
