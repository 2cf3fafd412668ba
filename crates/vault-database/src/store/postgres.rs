//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use vault_core::result::AppResult;
use vault_core::types::PageRequest;
use vault_entity::event::JournalEvent;
use vault_entity::node::{AncestorLink, NewNode, Node, PurgeOutcome};
use vault_entity::session::{CreateSession, Session};
use vault_entity::share::{CreateShare, OutgoingShare, Share, SharingUser};
use vault_entity::user::{CreateUser, User};

use super::{
    FavoriteQueries, JournalQueries, NodeQueries, SessionQueries, ShareQueries, Store,
    StoreTransaction, UserQueries,
};
use crate::errors;
use crate::repositories::{favorite, journal, node, session, share, user};

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| errors::database("Failed to begin transaction", e))?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }
}

/// An open PostgreSQL transaction. sqlx rolls it back on drop.
#[derive(Debug)]
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl NodeQueries for PgStoreTransaction {
    async fn insert_node(&mut self, new: &NewNode) -> AppResult<Node> {
        node::insert(&mut self.tx, new).await
    }

    async fn node_exists(&mut self, id: &str) -> AppResult<bool> {
        node::exists(&mut self.tx, id).await
    }

    async fn find_node(&mut self, id: &str) -> AppResult<Option<Node>> {
        node::find(&mut self.tx, id).await
    }

    async fn find_live_node(&mut self, id: &str) -> AppResult<Option<Node>> {
        node::find_live(&mut self.tx, id).await
    }

    async fn list_children(
        &mut self,
        owner_id: i64,
        parent_id: Option<&str>,
        page: &PageRequest,
    ) -> AppResult<Vec<Node>> {
        node::list_children(&mut self.tx, owner_id, parent_id, page).await
    }

    async fn rename_node(
        &mut self,
        id: &str,
        owner_id: i64,
        new_name: &str,
    ) -> AppResult<Option<Node>> {
        node::rename(&mut self.tx, id, owner_id, new_name).await
    }

    async fn move_node(
        &mut self,
        id: &str,
        owner_id: i64,
        new_parent_id: Option<&str>,
    ) -> AppResult<Option<Node>> {
        node::move_to(&mut self.tx, id, owner_id, new_parent_id).await
    }

    async fn trash_subtree(&mut self, id: &str, owner_id: i64) -> AppResult<Vec<String>> {
        node::trash_subtree(&mut self.tx, id, owner_id).await
    }

    async fn restore_subtree(
        &mut self,
        id: &str,
        owner_id: i64,
        destination: Option<&str>,
    ) -> AppResult<Option<Node>> {
        node::restore_subtree(&mut self.tx, id, owner_id, destination).await
    }

    async fn list_trash(&mut self, owner_id: i64, page: &PageRequest) -> AppResult<Vec<Node>> {
        node::list_trash(&mut self.tx, owner_id, page).await
    }

    async fn purge_trash(&mut self, owner_id: i64) -> AppResult<PurgeOutcome> {
        node::purge_trash(&mut self.tx, owner_id).await
    }

    async fn ancestor_chain(
        &mut self,
        node_id: &str,
        principal_id: i64,
    ) -> AppResult<Vec<AncestorLink>> {
        node::ancestor_chain(&mut self.tx, node_id, principal_id).await
    }
}

#[async_trait]
impl ShareQueries for PgStoreTransaction {
    async fn insert_share(&mut self, new: &CreateShare) -> AppResult<Share> {
        share::insert(&mut self.tx, new).await
    }

    async fn find_share(&mut self, id: i64, sharer_id: i64) -> AppResult<Option<Share>> {
        share::find(&mut self.tx, id, sharer_id).await
    }

    async fn delete_share(&mut self, id: i64, sharer_id: i64) -> AppResult<Option<Share>> {
        share::delete(&mut self.tx, id, sharer_id).await
    }

    async fn list_outgoing_shares(
        &mut self,
        sharer_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<OutgoingShare>> {
        share::list_outgoing(&mut self.tx, sharer_id, page).await
    }

    async fn list_sharing_users(
        &mut self,
        recipient_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<SharingUser>> {
        share::list_sharing_users(&mut self.tx, recipient_id, page).await
    }

    async fn list_directly_shared(
        &mut self,
        recipient_id: i64,
        sharer_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<Node>> {
        share::list_directly_shared(&mut self.tx, recipient_id, sharer_id, page).await
    }
}

#[async_trait]
impl FavoriteQueries for PgStoreTransaction {
    async fn insert_favorite(&mut self, user_id: i64, node_id: &str) -> AppResult<()> {
        favorite::insert(&mut self.tx, user_id, node_id).await
    }

    async fn delete_favorite(&mut self, user_id: i64, node_id: &str) -> AppResult<bool> {
        favorite::delete(&mut self.tx, user_id, node_id).await
    }

    async fn list_favorites(&mut self, user_id: i64, page: &PageRequest) -> AppResult<Vec<Node>> {
        favorite::list(&mut self.tx, user_id, page).await
    }
}

#[async_trait]
impl JournalQueries for PgStoreTransaction {
    async fn append_event(
        &mut self,
        user_id: i64,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> AppResult<i64> {
        journal::append(&mut self.tx, user_id, event_type, payload).await
    }

    async fn events_since(
        &mut self,
        user_id: i64,
        since: i64,
        limit: u32,
    ) -> AppResult<Vec<JournalEvent>> {
        journal::since(&mut self.tx, user_id, since, limit).await
    }

    async fn prune_events_before(&mut self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        journal::prune_before(&mut self.tx, cutoff).await
    }
}

#[async_trait]
impl UserQueries for PgStoreTransaction {
    async fn insert_user(&mut self, new: &CreateUser) -> AppResult<User> {
        user::insert(&mut self.tx, new).await
    }

    async fn find_user(&mut self, id: i64) -> AppResult<Option<User>> {
        user::find(&mut self.tx, id).await
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        user::find_by_username(&mut self.tx, username).await
    }

    async fn adjust_storage_used(&mut self, user_id: i64, delta: i64) -> AppResult<()> {
        user::adjust_storage_used(&mut self.tx, user_id, delta).await
    }

    async fn reserve_storage(&mut self, user_id: i64, bytes: i64) -> AppResult<bool> {
        user::reserve_storage(&mut self.tx, user_id, bytes).await
    }
}

#[async_trait]
impl SessionQueries for PgStoreTransaction {
    async fn insert_session(&mut self, new: &CreateSession) -> AppResult<Session> {
        session::insert(&mut self.tx, new).await
    }

    async fn find_session_by_token(&mut self, refresh_token: &str) -> AppResult<Option<Session>> {
        session::find_by_token(&mut self.tx, refresh_token).await
    }

    async fn list_sessions(&mut self, user_id: i64) -> AppResult<Vec<Session>> {
        session::list_for_user(&mut self.tx, user_id).await
    }

    async fn delete_session(&mut self, id: Uuid, user_id: i64) -> AppResult<bool> {
        session::delete(&mut self.tx, id, user_id).await
    }

    async fn delete_all_sessions(&mut self, user_id: i64) -> AppResult<u64> {
        session::delete_all_for_user(&mut self.tx, user_id).await
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| errors::database("Failed to commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| errors::database("Failed to roll back transaction", e))
    }
}
