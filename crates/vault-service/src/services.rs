//! Aggregate of every engine service, built once at startup.

use std::sync::Arc;

use vault_core::config::AppConfig;
use vault_core::traits::{BlobStore, Publisher};
use vault_database::Store;

use crate::favorite::FavoriteService;
use crate::file::{DownloadService, UploadService};
use crate::journal::{Journal, JournalService};
use crate::node::{NodeService, TrashService};
use crate::session::{SessionService, SessionVerifier};
use crate::share::ShareService;
use crate::user::UserService;

/// Every service, sharing one store, blob store, publisher, and set of
/// journal rules.
#[derive(Debug, Clone)]
pub struct Services {
    pub nodes: Arc<NodeService>,
    pub trash: Arc<TrashService>,
    pub uploads: Arc<UploadService>,
    pub downloads: Arc<DownloadService>,
    pub shares: Arc<ShareService>,
    pub favorites: Arc<FavoriteService>,
    pub sessions: Arc<SessionService>,
    pub users: Arc<UserService>,
    pub journal: Arc<JournalService>,
    pub verifier: Arc<SessionVerifier>,
}

impl Services {
    /// Wire the services over the given collaborators.
    pub fn new(
        store: Arc<dyn Store>,
        blobs: Arc<dyn BlobStore>,
        publisher: Arc<dyn Publisher>,
        config: &AppConfig,
    ) -> Self {
        let rules = Arc::new(Journal::new(config.journal.clone()));

        Self {
            nodes: Arc::new(NodeService::new(
                Arc::clone(&store),
                Arc::clone(&publisher),
                Arc::clone(&rules),
            )),
            trash: Arc::new(TrashService::new(
                Arc::clone(&store),
                Arc::clone(&blobs),
                Arc::clone(&publisher),
                Arc::clone(&rules),
            )),
            uploads: Arc::new(UploadService::new(
                Arc::clone(&store),
                Arc::clone(&blobs),
                Arc::clone(&publisher),
                Arc::clone(&rules),
            )),
            downloads: Arc::new(DownloadService::new(Arc::clone(&store), blobs)),
            shares: Arc::new(ShareService::new(
                Arc::clone(&store),
                Arc::clone(&publisher),
                Arc::clone(&rules),
            )),
            favorites: Arc::new(FavoriteService::new(
                Arc::clone(&store),
                Arc::clone(&publisher),
                Arc::clone(&rules),
            )),
            sessions: Arc::new(SessionService::new(
                Arc::clone(&store),
                publisher,
                config.session.clone(),
            )),
            users: Arc::new(UserService::new(Arc::clone(&store), &config.storage)),
            journal: Arc::new(JournalService::new(Arc::clone(&store), rules)),
            verifier: Arc::new(SessionVerifier::new(store)),
        }
    }
}
