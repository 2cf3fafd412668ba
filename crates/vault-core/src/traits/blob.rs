//! Blob store trait for node content.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for reading blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Content store keyed by node id.
///
/// The engine only ever writes a blob before the node row exists and
/// deletes it after the row is gone, so implementations need no knowledge
/// of the tree.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug + 'static {
    /// Store the bytes for `id`, replacing any previous content.
    async fn save(&self, id: &str, data: Bytes) -> AppResult<()>;

    /// Open the content of `id` as a stream.
    async fn get(&self, id: &str) -> AppResult<ByteStream>;

    /// Remove the content of `id`. Removing a missing key succeeds.
    async fn delete(&self, id: &str) -> AppResult<()>;

    /// Whether content exists for `id`.
    async fn exists(&self, id: &str) -> AppResult<bool>;
}
