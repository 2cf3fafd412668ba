//! Favorite add, remove, and listing.

use std::sync::Arc;

use tracing::debug;

use vault_core::error::AppError;
use vault_core::events::EventType;
use vault_core::result::AppResult;
use vault_core::traits::Publisher;
use vault_core::types::{PageRequest, validate_node_id};
use vault_database::Store;
use vault_database::store::FavoriteQueries;
use vault_entity::event::NodeRefPayload;
use vault_entity::node::Node;

use crate::access::resolver;
use crate::context::RequestContext;
use crate::journal::Journal;
use crate::unit_of_work::UnitOfWork;

/// Marks readable nodes as favorites of the caller.
#[derive(Clone)]
pub struct FavoriteService {
    store: Arc<dyn Store>,
    publisher: Arc<dyn Publisher>,
    journal: Arc<Journal>,
}

impl std::fmt::Debug for FavoriteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoriteService").finish()
    }
}

impl FavoriteService {
    /// Creates a new favorite service.
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

    /// Mark a node the caller can read.
    pub async fn add(&self, ctx: &RequestContext, node_id: &str) -> AppResult<()> {
        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        resolver::require_readable(uow.tx(), node_id, ctx.user_id).await?;
        uow.tx().insert_favorite(ctx.user_id, node_id).await?;
        self.record(&mut uow, ctx, EventType::FavoriteAdded, node_id)
            .await?;
        uow.commit(self.publisher.as_ref()).await?;

        debug!(node_id, user_id = ctx.user_id, "Favorite added");
        Ok(())
    }

    /// Remove a marker.
    pub async fn remove(&self, ctx: &RequestContext, node_id: &str) -> AppResult<()> {
        validate_node_id(node_id)?;

        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        if !uow.tx().delete_favorite(ctx.user_id, node_id).await? {
            return Err(AppError::not_found("Favorite not found"));
        }
        self.record(&mut uow, ctx, EventType::FavoriteRemoved, node_id)
            .await?;
        uow.commit(self.publisher.as_ref()).await?;

        debug!(node_id, user_id = ctx.user_id, "Favorite removed");
        Ok(())
    }

    /// The caller's live favorites, by name.
    pub async fn list(&self, ctx: &RequestContext, page: PageRequest) -> AppResult<Vec<Node>> {
        let mut tx = self.store.begin().await?;
        let nodes = tx.list_favorites(ctx.user_id, &page).await?;
        tx.rollback().await?;
        Ok(nodes)
    }

    async fn record(
        &self,
        uow: &mut UnitOfWork,
        ctx: &RequestContext,
        event_type: EventType,
        node_id: &str,
    ) -> AppResult<()> {
        uow.record(
            &self.journal,
            &[ctx.user_id],
            event_type,
            &NodeRefPayload {
                node_id: node_id.to_string(),
            },
        )
        .await
    }
}
