//! Local filesystem blob store.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use vault_core::error::{AppError, ErrorKind};
use vault_core::result::AppResult;
use vault_core::traits::{BlobStore, ByteStream};

/// Blob store that keeps one file per node id under a root directory.
///
/// Files are fanned out into two levels of subdirectories taken from the
/// first characters of the id, so `V1StGXR8_Z5jdHi6B-myT` lives at
/// `V1/St/V1StGXR8_Z5jdHi6B-myT`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root_path`, creating the directory.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, id: &str) -> AppResult<PathBuf> {
        if id.len() < 4 || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AppError::invalid_operation(format!("Invalid blob key: {id}")));
        }
        Ok(self.root.join(&id[0..2]).join(&id[2..4]).join(id))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, id: &str, data: Bytes) -> AppResult<()> {
        let path = self.resolve(id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create blob directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        // Write beside the target and rename so readers never see a partial blob.
        let staging = path.with_extension("part");
        let mut file = fs::File::create(&staging).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to create blob: {id}"), e)
        })?;
        file.write_all(&data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write blob: {id}"), e)
        })?;
        file.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush blob", e))?;
        drop(file);

        fs::rename(&staging, &path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to commit blob: {id}"), e)
        })?;

        debug!(id, bytes = data.len(), "Saved blob");
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<ByteStream> {
        let path = self.resolve(id)?;
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                AppError::not_found(format!("Blob not found: {id}"))
            } else {
                AppError::with_source(ErrorKind::Storage, format!("Failed to open blob: {id}"), e)
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let path = self.resolve(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(id, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete blob: {id}"),
                e,
            )),
        }
    }

    async fn exists(&self, id: &str) -> AppResult<bool> {
        let path = self.resolve(id)?;
        fs::try_exists(&path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to stat blob: {id}"), e)
        })
    }
}
