//! Trash listing, restore, and purge.

use std::sync::Arc;

use tracing::{error, info};

use vault_core::error::AppError;
use vault_core::events::EventType;
use vault_core::result::AppResult;
use vault_core::traits::{BlobStore, Publisher};
use vault_core::types::{PageRequest, validate_node_id};
use vault_database::Store;
use vault_database::store::{NodeQueries, UserQueries};
use vault_entity::event::TrashPurgedPayload;
use vault_entity::node::{Node, PurgeOutcome};

use crate::context::RequestContext;
use crate::journal::Journal;
use crate::unit_of_work::UnitOfWork;

/// Owner-only operations on trashed nodes.
#[derive(Clone)]
pub struct TrashService {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
    publisher: Arc<dyn Publisher>,
    journal: Arc<Journal>,
}

impl std::fmt::Debug for TrashService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrashService").finish()
    }
}

impl TrashService {
    /// Creates a new trash service.
    pub fn new(
        store: Arc<dyn Store>,
        blobs: Arc<dyn BlobStore>,
        publisher: Arc<dyn Publisher>,
        journal: Arc<Journal>,
    ) -> Self {
        Self {
            store,
            blobs,
            publisher,
            journal,
        }
    }

    /// Roots of the caller's trash batches, most recently trashed first.
    pub async fn list_trash(&self, ctx: &RequestContext, page: PageRequest) -> AppResult<Vec<Node>> {
        let mut tx = self.store.begin().await?;
        let nodes = tx.list_trash(ctx.user_id, &page).await?;
        tx.rollback().await?;
        Ok(nodes)
    }

    /// Restore a trashed node together with everything trashed with it.
    ///
    /// The node returns to its original parent when that folder is still
    /// live, otherwise to the owner's root. A live sibling with the same
    /// name is a `Conflict` and leaves the whole batch in the trash.
    pub async fn restore(&self, ctx: &RequestContext, node_id: &str) -> AppResult<Node> {
        validate_node_id(node_id)?;

        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let node = uow
            .tx()
            .find_node(node_id)
            .await?
            .filter(|n| n.owner_id == ctx.user_id && !n.is_live())
            .ok_or_else(|| AppError::not_found("Node not found in trash"))?;

        let destination = match node.original_parent_id.as_deref() {
            Some(parent_id) => uow
                .tx()
                .find_live_node(parent_id)
                .await?
                .filter(|p| p.owner_id == node.owner_id)
                .map(|p| p.id),
            None => None,
        };

        let restored = uow
            .tx()
            .restore_subtree(node_id, ctx.user_id, destination.as_deref())
            .await?
            .ok_or_else(|| AppError::not_found("Node not found in trash"))?;

        uow.record(
            &self.journal,
            &[ctx.user_id],
            EventType::NodeRestored,
            &restored,
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;

        info!(
            node_id,
            parent_id = ?restored.parent_id,
            user_id = ctx.user_id,
            "Node restored"
        );
        Ok(restored)
    }

    /// Permanently delete the caller's trash.
    ///
    /// Rows, quota release, and the journal entry commit together; blobs
    /// are deleted afterwards and failures are only logged.
    pub async fn purge(&self, ctx: &RequestContext) -> AppResult<PurgeOutcome> {
        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        let outcome = uow.tx().purge_trash(ctx.user_id).await?;
        if outcome.purged_count == 0 {
            uow.rollback().await?;
            return Ok(outcome);
        }

        uow.tx()
            .adjust_storage_used(ctx.user_id, -outcome.bytes_freed)
            .await?;
        uow.record(
            &self.journal,
            &[ctx.user_id],
            EventType::TrashPurged,
            &TrashPurgedPayload {
                purged_count: outcome.purged_count,
                bytes_freed: outcome.bytes_freed,
            },
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;

        for file_id in &outcome.file_ids {
            if let Err(e) = self.blobs.delete(file_id).await {
                error!(node_id = %file_id, error = %e, "Failed to delete purged blob");
            }
        }

        info!(
            user_id = ctx.user_id,
            purged = outcome.purged_count,
            bytes_freed = outcome.bytes_freed,
            "Trash purged"
        );
        Ok(outcome)
    }
}
