//! Shared test helpers for integration tests.

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use tempfile::TempDir;

use vault_core::config::{
    AppConfig, DatabaseConfig, JournalConfig, LoggingConfig, RealtimeConfig, ServerConfig,
    SessionConfig, StorageConfig,
};
use vault_core::result::AppResult;
use vault_core::traits::{BlobStore, ByteStream, Principal, Publisher};
use vault_database::{MemoryStore, Store};
use vault_entity::event::JournalEvent;
use vault_entity::node::Node;
use vault_entity::user::User;
use vault_realtime::Hub;
use vault_service::{RequestContext, Services};
use vault_storage::LocalBlobStore;

/// Quota given to users created through [`TestApp::create_user`].
pub const TEST_QUOTA: i64 = 1_000_000;

/// Blob store that can run one queued action in the middle of a save,
/// after the bytes are written and before the save returns
pub struct InterruptingBlobStore {
    inner: Arc<LocalBlobStore>,
    pending: Mutex<Option<BoxFuture<'static, ()>>>,
}

impl std::fmt::Debug for InterruptingBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptingBlobStore")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl InterruptingBlobStore {
    fn new(inner: Arc<LocalBlobStore>) -> Self {
        Self {
            inner,
            pending: Mutex::new(None),
        }
    }

    fn arm(&self, action: BoxFuture<'static, ()>) {
        *self.pending.lock().expect("pending lock") = Some(action);
    }
}

#[async_trait]
impl BlobStore for InterruptingBlobStore {
    async fn save(&self, id: &str, data: Bytes) -> AppResult<()> {
        self.inner.save(id, data).await?;
        let action = self.pending.lock().expect("pending lock").take();
        if let Some(action) = action {
            action.await;
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<ByteStream> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.inner.delete(id).await
    }

    async fn exists(&self, id: &str) -> AppResult<bool> {
        self.inner.exists(id).await
    }
}

/// Test application context
pub struct TestApp {
    /// Every engine service
    pub services: Services,
    /// The notification hub the services publish to
    pub hub: Arc<Hub>,
    /// Blob store rooted in `blob_dir`
    pub blobs: Arc<LocalBlobStore>,
    interrupter: Arc<InterruptingBlobStore>,
    blob_dir: TempDir,
}

impl TestApp {
    /// Create a new test application over an empty in-memory store
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a test application with custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Self::with_store(store, config).await
    }

    /// Create a test application over an existing store
    pub async fn with_store(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let blob_dir = TempDir::new().expect("Failed to create blob dir");
        let blobs = Arc::new(
            LocalBlobStore::new(blob_dir.path())
                .await
                .expect("Failed to init blob store"),
        );
        let interrupter = Arc::new(InterruptingBlobStore::new(Arc::clone(&blobs)));
        let hub = Arc::new(Hub::new(config.realtime.clone()));

        let services = Services::new(
            store,
            Arc::clone(&interrupter) as Arc<dyn BlobStore>,
            Arc::clone(&hub) as Arc<dyn Publisher>,
            &config,
        );

        Self {
            services,
            hub,
            blobs,
            interrupter,
            blob_dir,
        }
    }

    /// Run `action` inside the next blob save, while no store transaction
    /// of the saving upload is open
    pub fn during_next_save(&self, action: impl Future<Output = ()> + Send + 'static) {
        self.interrupter.arm(Box::pin(action));
    }

    /// Current storage counter of a user
    pub async fn storage_used(&self, username: &str) -> i64 {
        self.services
            .users
            .find_by_username(username)
            .await
            .expect("Failed to find user")
            .storage_used_bytes
    }

    /// Create a user with [`TEST_QUOTA`] and a request context for them
    pub async fn create_user(&self, username: &str) -> (User, RequestContext) {
        self.create_user_with_quota(username, TEST_QUOTA).await
    }

    /// Create a user with an explicit quota
    pub async fn create_user_with_quota(
        &self,
        username: &str,
        quota: i64,
    ) -> (User, RequestContext) {
        let user = self
            .services
            .users
            .create_user_with_quota(username, None, quota)
            .await
            .expect("Failed to create test user");
        let ctx = context_for(&user);
        (user, ctx)
    }

    /// Create a folder, panicking on failure
    pub async fn folder(&self, ctx: &RequestContext, parent: Option<&str>, name: &str) -> Node {
        self.services
            .nodes
            .create_folder(ctx, parent, name)
            .await
            .unwrap_or_else(|e| panic!("Failed to create folder '{name}': {e}"))
    }

    /// Upload a single file, panicking on failure
    pub async fn file(
        &self,
        ctx: &RequestContext,
        parent: Option<&str>,
        name: &str,
        content: &'static [u8],
    ) -> Node {
        let outcome = self
            .services
            .uploads
            .upload(
                ctx,
                parent,
                vec![vault_service::UploadFile::new(
                    name,
                    None,
                    Bytes::from_static(content),
                )],
            )
            .await
            .unwrap_or_else(|e| panic!("Failed to upload '{name}': {e}"));
        assert!(outcome.failed.is_empty(), "upload failed: {:?}", outcome.failed);
        outcome.created.into_iter().next().expect("one node created")
    }

    /// Names of the live children of a folder, in listing order
    pub async fn child_names(&self, ctx: &RequestContext, parent: Option<&str>) -> Vec<String> {
        self.services
            .nodes
            .list_children(ctx, parent, Default::default())
            .await
            .expect("Failed to list children")
            .into_iter()
            .map(|n| n.name)
            .collect()
    }

    /// Every journal entry addressed to the user, oldest first
    pub async fn events(&self, ctx: &RequestContext) -> Vec<JournalEvent> {
        let mut all = Vec::new();
        let mut since = 0;
        loop {
            let page = self
                .services
                .journal
                .events_since(ctx, since)
                .await
                .expect("Failed to read journal");
            let Some(last) = page.last() else {
                return all;
            };
            since = last.id;
            all.extend(page);
        }
    }

    /// Number of blob files on disk
    pub fn blob_count(&self) -> usize {
        fn walk(dir: &std::path::Path) -> usize {
            std::fs::read_dir(dir)
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .map(|e| {
                            let path = e.path();
                            if path.is_dir() { walk(&path) } else { 1 }
                        })
                        .sum()
                })
                .unwrap_or(0)
        }
        walk(self.blob_dir.path())
    }
}

/// A request context for `user`
pub fn context_for(user: &User) -> RequestContext {
    RequestContext::for_principal(Principal::new(user.id, user.username.clone()))
}

/// Read a whole byte stream into memory
pub async fn read_all(stream: ByteStream) -> Vec<u8> {
    let chunks: Vec<Bytes> = stream.try_collect().await.expect("Failed to read stream");
    chunks.concat()
}

/// Configuration with defaults everywhere and no database
pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 2,
            min_connections: 0,
            connect_timeout_seconds: 5,
            idle_timeout_seconds: 60,
            run_migrations: true,
        },
        storage: StorageConfig::default(),
        realtime: RealtimeConfig::default(),
        journal: JournalConfig::default(),
        session: SessionConfig::default(),
        logging: LoggingConfig::default(),
    }
}
