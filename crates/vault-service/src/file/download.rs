//! File download and streamed subtree walks for archive export.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use vault_core::error::AppError;
use vault_core::result::AppResult;
use vault_core::traits::{BlobStore, ByteStream};
use vault_core::types::PageRequest;
use vault_database::Store;
use vault_database::store::NodeQueries;
use vault_entity::node::Node;

use crate::access::resolver;
use crate::context::RequestContext;

/// Children fetched per lookup during a walk.
const WALK_PAGE_SIZE: u64 = 500;

/// A node reached by a subtree walk.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveEntry {
    /// The node.
    pub node: Node,
    /// `/`-separated path from the walk root, starting with its name.
    pub path: String,
}

/// Reads file content and walks subtrees for export.
#[derive(Clone)]
pub struct DownloadService {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for DownloadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadService").finish()
    }
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Open the content of a file the caller can read.
    pub async fn open_file(
        &self,
        ctx: &RequestContext,
        node_id: &str,
    ) -> AppResult<(Node, ByteStream)> {
        let mut tx = self.store.begin().await?;
        let (node, _) = resolver::require_readable(&mut *tx, node_id, ctx.user_id).await?;
        tx.rollback().await?;

        if node.is_folder() {
            return Err(AppError::invalid_operation("Folders have no content"));
        }
        let content = self.blobs.get(&node.id).await?;
        Ok((node, content))
    }

    /// Open the content of an entry produced by [`Self::walk_subtree`].
    pub async fn open_entry(&self, entry: &ArchiveEntry) -> AppResult<ByteStream> {
        if entry.node.is_folder() {
            return Err(AppError::invalid_operation("Folders have no content"));
        }
        self.blobs.get(&entry.node.id).await
    }

    /// Walk a readable subtree depth-first, root first.
    ///
    /// Children are looked up one folder page at a time, as the stream is
    /// polled. `cancel` is checked before every lookup; once it fires the
    /// stream yields a single `Cancelled` error and ends. Any other error
    /// also ends the stream.
    pub fn walk_subtree(
        &self,
        ctx: &RequestContext,
        root_id: &str,
        cancel: CancellationToken,
    ) -> BoxStream<'static, AppResult<ArchiveEntry>> {
        let walk = Walk {
            store: self.store.clone(),
            principal_id: ctx.user_id,
            cancel,
            root: Some(root_id.to_string()),
            stack: Vec::new(),
            finished: false,
        };

        stream::unfold(walk, |mut walk| async move {
            if walk.finished {
                return None;
            }
            match walk.advance().await {
                Ok(Some(entry)) => Some((Ok(entry), walk)),
                Ok(None) => None,
                Err(e) => {
                    walk.finished = true;
                    Some((Err(e), walk))
                }
            }
        })
        .boxed()
    }
}

struct Walk {
    store: Arc<dyn Store>,
    principal_id: i64,
    cancel: CancellationToken,
    root: Option<String>,
    stack: Vec<ArchiveEntry>,
    finished: bool,
}

impl Walk {
    fn check_cancelled(&self) -> AppResult<()> {
        if self.cancel.is_cancelled() {
            debug!(principal_id = self.principal_id, "Subtree walk cancelled");
            return Err(AppError::cancelled("Subtree walk cancelled"));
        }
        Ok(())
    }

    async fn advance(&mut self) -> AppResult<Option<ArchiveEntry>> {
        self.check_cancelled()?;

        if let Some(root_id) = self.root.take() {
            let mut tx = self.store.begin().await?;
            let (node, _) = resolver::require_readable(&mut *tx, &root_id, self.principal_id).await?;
            tx.rollback().await?;
            let path = node.name.clone();
            self.stack.push(ArchiveEntry { node, path });
        }

        let Some(entry) = self.stack.pop() else {
            return Ok(None);
        };
        if entry.node.is_folder() {
            let children = self.children_of(&entry.node).await?;
            // Reverse so the first child is popped first.
            for child in children.into_iter().rev() {
                let path = format!("{}/{}", entry.path, child.name);
                self.stack.push(ArchiveEntry { node: child, path });
            }
        }
        Ok(Some(entry))
    }

    async fn children_of(&self, folder: &Node) -> AppResult<Vec<Node>> {
        let mut children = Vec::new();
        let mut page = 1;
        loop {
            self.check_cancelled()?;
            let request = PageRequest::new(page, WALK_PAGE_SIZE);
            let mut tx = self.store.begin().await?;
            let batch = tx
                .list_children(folder.owner_id, Some(folder.id.as_str()), &request)
                .await?;
            tx.rollback().await?;

            let done = (batch.len() as u64) < request.limit();
            children.extend(batch);
            if done {
                return Ok(children);
            }
            page += 1;
        }
    }
}
