//! Multi-file upload with batch quota check and per-file isolation.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use vault_core::error::{AppError, ErrorKind};
use vault_core::events::EventType;
use vault_core::result::AppResult;
use vault_core::traits::{BlobStore, Publisher};
use vault_core::types::validate_node_id;
use vault_database::Store;
use vault_database::store::{NodeQueries, UserQueries};
use vault_entity::node::{NewNode, Node};
use vault_storage::mime_from_name;

use crate::access::resolver;
use crate::context::RequestContext;
use crate::journal::Journal;
use crate::node::naming::{allocate_node_id, validate_name};
use crate::unit_of_work::UnitOfWork;

/// One file of an upload batch.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name as sent by the client.
    pub name: String,
    /// Declared content type. Guessed from the name when absent.
    pub content_type: Option<String>,
    /// File content.
    pub data: Bytes,
}

impl UploadFile {
    /// Create an upload entry.
    pub fn new(name: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type,
            data,
        }
    }

    fn size(&self) -> i64 {
        i64::try_from(self.data.len()).unwrap_or(i64::MAX)
    }
}

/// A file of the batch that was not stored.
#[derive(Debug, Clone, Serialize)]
pub struct UploadFailure {
    /// File name as sent by the client.
    pub name: String,
    /// Error category.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
}

/// Result of an upload batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadOutcome {
    /// Nodes created, in batch order.
    pub created: Vec<Node>,
    /// Files that failed, in batch order.
    pub failed: Vec<UploadFailure>,
}

/// Handles file uploads into the node tree.
#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
    publisher: Arc<dyn Publisher>,
    journal: Arc<Journal>,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService").finish()
    }
}

impl UploadService {
    /// Creates a new upload service.
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

    /// Upload `files` under `parent_id` (the caller's root when `None`).
    ///
    /// The whole batch is reserved against the owner's quota before any
    /// blob is written; a batch that does not fit is rejected whole. After
    /// that each file stands alone: its blob is saved, then its node and
    /// journal entry commit in one transaction that checks write access to
    /// the destination again. A failed file deletes its blob best-effort
    /// and hands its share of the reservation back.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        parent_id: Option<&str>,
        files: Vec<UploadFile>,
    ) -> AppResult<UploadOutcome> {
        if files.is_empty() {
            return Err(AppError::validation("No files uploaded"));
        }
        if let Some(id) = parent_id {
            validate_node_id(id)?;
        }

        let owner_id = self.reserve_batch(ctx, parent_id, &files).await?;

        let mut outcome = UploadOutcome::default();
        for file in files {
            let name = file.name.clone();
            let size = file.size();
            match self.store_one(ctx, owner_id, parent_id, file).await {
                Ok(node) => outcome.created.push(node),
                Err(e) => {
                    warn!(file = %name, error = %e, "Upload of file failed");
                    self.release(owner_id, size).await;
                    outcome.failed.push(UploadFailure {
                        name,
                        kind: e.kind,
                        message: e.message,
                    });
                }
            }
        }

        info!(
            user_id = ctx.user_id,
            owner_id,
            created = outcome.created.len(),
            failed = outcome.failed.len(),
            "Upload batch finished"
        );
        Ok(outcome)
    }

    /// Resolve the owner of the destination and reserve the batch total
    /// against their quota.
    async fn reserve_batch(
        &self,
        ctx: &RequestContext,
        parent_id: Option<&str>,
        files: &[UploadFile],
    ) -> AppResult<i64> {
        let total = files
            .iter()
            .fold(0i64, |sum, f| sum.saturating_add(f.size()));

        let mut tx = self.store.begin().await?;
        let owner_id = match parent_id {
            None => ctx.user_id,
            Some(id) => {
                resolver::require_writable_folder(&mut *tx, id, ctx.user_id)
                    .await?
                    .owner_id
            }
        };

        if !tx.reserve_storage(owner_id, total).await? {
            let owner = tx
                .find_user(owner_id)
                .await?
                .ok_or_else(|| AppError::not_found("Owner not found"))?;
            return Err(AppError::quota_exceeded(format!(
                "Upload of {total} bytes exceeds the remaining quota of {} bytes",
                owner.remaining_quota()
            )));
        }
        tx.commit().await?;

        debug!(owner_id, bytes = total, "Reserved storage for upload batch");
        Ok(owner_id)
    }

    /// Return `bytes` of an unused reservation.
    async fn release(&self, owner_id: i64, bytes: i64) {
        if bytes == 0 {
            return;
        }
        let released: AppResult<()> = async {
            let mut tx = self.store.begin().await?;
            tx.adjust_storage_used(owner_id, -bytes).await?;
            tx.commit().await
        }
        .await;
        if let Err(e) = released {
            error!(owner_id, bytes, error = %e, "Failed to release storage reservation");
        }
    }

    async fn store_one(
        &self,
        ctx: &RequestContext,
        owner_id: i64,
        parent_id: Option<&str>,
        file: UploadFile,
    ) -> AppResult<Node> {
        let name = validate_name(&file.name)?;
        let size = file.size();
        let mime = file
            .content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| mime_from_name(&name).to_string());

        let id = {
            let mut tx = self.store.begin().await?;
            let id = allocate_node_id(&mut *tx).await?;
            tx.rollback().await?;
            id
        };

        self.blobs.save(&id, file.data).await?;

        let new = NewNode::file(
            id.clone(),
            owner_id,
            parent_id.map(str::to_string),
            name,
            size,
            mime,
        );
        match self.commit_node(ctx, new).await {
            Ok(node) => Ok(node),
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&id).await {
                    error!(node_id = %id, error = %cleanup, "Failed to delete orphaned blob");
                }
                Err(e)
            }
        }
    }

    async fn commit_node(&self, ctx: &RequestContext, new: NewNode) -> AppResult<Node> {
        let mut uow = UnitOfWork::begin(self.store.as_ref()).await?;
        if let Some(parent_id) = new.parent_id.as_deref() {
            resolver::require_writable_folder(uow.tx(), parent_id, ctx.user_id).await?;
        }
        let node = uow.tx().insert_node(&new).await?;
        uow.record(
            &self.journal,
            &[ctx.user_id, node.owner_id],
            EventType::NodeCreated,
            &node,
        )
        .await?;
        uow.commit(self.publisher.as_ref()).await?;
        Ok(node)
    }
}
