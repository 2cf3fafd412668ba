//! Share grant, revoke, and shared-with-me listings.

use std::sync::Arc;

use tracing::info;

use vault_core::error::AppError;
use vault_core::events::EventType;
use vault_core::result::AppResult;
use vault_core::traits::Publisher;
use vault_core::types::PageRequest;
use vault_database::Store;
use vault_database::store::{NodeQueries, ShareQueries, UserQueries};
use vault_entity::event::{NodeRefPayload, NodeSharedPayload};
use vault_entity::node::Node;
use vault_entity::share::{CreateShare, OutgoingShare, Permission, Share, SharingUser};

use crate::access::resolver;
use crate::context::RequestContext;
use crate::journal::Journal;
use crate::unit_of_work::UnitOfWork;

/// Manages share creation, listing, and revocation.
#[derive(Clone)]
pub struct ShareService {
    store: Arc<dyn Store>,
    publisher: Arc<dyn Publisher>,
    journal: Arc<Journal>,
}

impl std::fmt::Debug for ShareService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareService").finish()
    }
}

impl ShareService {
    /// Creates a new share service.
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

    /// Share a node the caller owns with another user.
    ///
    /// The recipient is told through `node_shared_with_you`. A second share
    /// of the same node with the same recipient is a `Conflict`.
    pub async fn share(
        &self,
        ctx: &RequestContext,
        node_id: &str,
        recipient_username: &str,
        permissions: Permission,
    ) -> AppResult<Share> {
        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let (node, _) = resolver::require_readable(uow.tx(), node_id, ctx.user_id).await?;
        if node.owner_id != ctx.user_id {
            return Err(AppError::permission_denied(
                "Only the owner can share this node",
            ));
        }

        let recipient = uow
            .tx()
            .find_user_by_username(recipient_username.trim())
            .await?
            .ok_or_else(|| AppError::not_found("Recipient not found"))?;
        if recipient.id == ctx.user_id {
            return Err(AppError::invalid_operation("Cannot share a node with yourself"));
        }

        let share = uow
            .tx()
            .insert_share(&CreateShare {
                node_id: node.id.clone(),
                sharer_id: ctx.user_id,
                recipient_id: recipient.id,
                permissions,
            })
            .await?;

        uow.record(
            &self.journal,
            &[recipient.id],
            EventType::NodeSharedWithYou,
            &NodeSharedPayload {
                share_info: share.clone(),
                node_info: node,
            },
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;

        info!(
            share_id = share.id,
            node_id,
            sharer_id = ctx.user_id,
            recipient_id = recipient.id,
            permissions = %permissions,
            "Node shared"
        );
        Ok(share)
    }

    /// Revoke a share the caller created.
    pub async fn revoke(&self, ctx: &RequestContext, share_id: i64) -> AppResult<Share> {
        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let share = uow
            .tx()
            .delete_share(share_id, ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Share not found"))?;

        uow.record(
            &self.journal,
            &[share.recipient_id],
            EventType::ShareRevokedForYou,
            &NodeRefPayload {
                node_id: share.node_id.clone(),
            },
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;

        info!(share_id, sharer_id = ctx.user_id, "Share revoked");
        Ok(share)
    }

    /// Shares the caller created, newest first.
    pub async fn list_outgoing(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> AppResult<Vec<OutgoingShare>> {
        let mut tx = self.store.begin().await?;
        let shares = tx.list_outgoing_shares(ctx.user_id, &page).await?;
        tx.rollback().await?;
        Ok(shares)
    }

    /// Users who shared at least one node with the caller.
    pub async fn list_sharing_users(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> AppResult<Vec<SharingUser>> {
        let mut tx = self.store.begin().await?;
        let users = tx.list_sharing_users(ctx.user_id, &page).await?;
        tx.rollback().await?;
        Ok(users)
    }

    /// Browse what `sharer_username` shared with the caller.
    ///
    /// Without a parent this is the set of directly shared nodes. With a
    /// parent it lists that folder's children, provided the caller can
    /// read the folder and it belongs to the sharer.
    pub async fn list_shared_nodes(
        &self,
        ctx: &RequestContext,
        sharer_username: &str,
        parent_id: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Vec<Node>> {
        let mut tx = self.store.begin().await?;
        let sharer = tx
            .find_user_by_username(sharer_username.trim())
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let nodes = match parent_id {
            None => tx.list_directly_shared(ctx.user_id, sharer.id, &page).await?,
            Some(id) => {
                let (parent, _) = resolver::require_readable(&mut *tx, id, ctx.user_id).await?;
                if parent.owner_id != sharer.id {
                    return Err(AppError::not_found("Node not found"));
                }
                if !parent.is_folder() {
                    return Err(AppError::invalid_operation("Node is not a folder"));
                }
                tx.list_children(sharer.id, Some(id), &page).await?
            }
        };
        tx.rollback().await?;
        Ok(nodes)
    }
}
