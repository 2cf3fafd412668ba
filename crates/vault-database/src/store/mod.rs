//! Store and transaction traits.
//!
//! A [`StoreTransaction`] is the only way to read or write engine state.
//! Dropping one without calling [`StoreTransaction::commit`] rolls it back,
//! so any `?` that leaves a service method discards the partial mutation
//! together with its journal rows.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use vault_core::result::AppResult;
use vault_core::types::PageRequest;
use vault_entity::event::JournalEvent;
use vault_entity::node::{AncestorLink, NewNode, Node, PurgeOutcome};
use vault_entity::session::{CreateSession, Session};
use vault_entity::share::{CreateShare, OutgoingShare, Share, SharingUser};
use vault_entity::user::{CreateUser, User};

/// Upper bound on ancestor walks. Deeper trees are truncated.
pub const MAX_TREE_DEPTH: i32 = 4096;

/// Entry point: hands out transactions.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Open a transaction.
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>>;
}

/// Node tree queries.
#[async_trait]
pub trait NodeQueries: Send {
    /// Insert a node. Fails `NotFound` when the parent is missing or in
    /// the trash and `Conflict` when a live sibling already has the name.
    /// The parent stays live until the transaction ends.
    async fn insert_node(&mut self, node: &NewNode) -> AppResult<Node>;

    /// Whether any row, live or trashed, uses `id`.
    async fn node_exists(&mut self, id: &str) -> AppResult<bool>;

    /// Fetch a node regardless of its trash state.
    async fn find_node(&mut self, id: &str) -> AppResult<Option<Node>>;

    /// Fetch a live node.
    async fn find_live_node(&mut self, id: &str) -> AppResult<Option<Node>>;

    /// Live children of `parent_id` (or the owner's root), folders first,
    /// then by name.
    async fn list_children(
        &mut self,
        owner_id: i64,
        parent_id: Option<&str>,
        page: &PageRequest,
    ) -> AppResult<Vec<Node>>;

    /// Rename a live node of `owner_id`. `None` when no such node exists.
    async fn rename_node(
        &mut self,
        id: &str,
        owner_id: i64,
        new_name: &str,
    ) -> AppResult<Option<Node>>;

    /// Reparent a live node of `owner_id`. `None` when no such node exists.
    async fn move_node(
        &mut self,
        id: &str,
        owner_id: i64,
        new_parent_id: Option<&str>,
    ) -> AppResult<Option<Node>>;

    /// Trash a live node of `owner_id` and every live descendant in one
    /// step. Returns the ids trashed, empty when the node was not found.
    async fn trash_subtree(&mut self, id: &str, owner_id: i64) -> AppResult<Vec<String>>;

    /// Restore a trashed node of `owner_id` together with the members of
    /// its trash batch below it. The root is attached to `destination`;
    /// the other members return to their original parents. `None` when no
    /// trashed node matches.
    async fn restore_subtree(
        &mut self,
        id: &str,
        owner_id: i64,
        destination: Option<&str>,
    ) -> AppResult<Option<Node>>;

    /// Roots of the owner's trash batches, most recently trashed first.
    async fn list_trash(&mut self, owner_id: i64, page: &PageRequest) -> AppResult<Vec<Node>>;

    /// Permanently delete every trashed node of the owner.
    async fn purge_trash(&mut self, owner_id: i64) -> AppResult<PurgeOutcome>;

    /// Walk from a live node up to its root, reporting at each step the
    /// owner and the share held by `principal_id`. Empty when the node is
    /// not live.
    async fn ancestor_chain(
        &mut self,
        node_id: &str,
        principal_id: i64,
    ) -> AppResult<Vec<AncestorLink>>;
}

/// Share grant queries.
#[async_trait]
pub trait ShareQueries: Send {
    /// Insert a share. `Conflict` on a duplicate `(node, recipient)`.
    async fn insert_share(&mut self, share: &CreateShare) -> AppResult<Share>;

    /// A share created by `sharer_id`.
    async fn find_share(&mut self, id: i64, sharer_id: i64) -> AppResult<Option<Share>>;

    /// Delete a share created by `sharer_id`, returning it.
    async fn delete_share(&mut self, id: i64, sharer_id: i64) -> AppResult<Option<Share>>;

    /// Shares created by `sharer_id`, newest first.
    async fn list_outgoing_shares(
        &mut self,
        sharer_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<OutgoingShare>>;

    /// Distinct users who shared something with `recipient_id`.
    async fn list_sharing_users(
        &mut self,
        recipient_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<SharingUser>>;

    /// Live nodes `sharer_id` shared directly with `recipient_id`.
    async fn list_directly_shared(
        &mut self,
        recipient_id: i64,
        sharer_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<Node>>;
}

/// Favorite marker queries.
#[async_trait]
pub trait FavoriteQueries: Send {
    /// Mark a node. `Conflict` when already marked.
    async fn insert_favorite(&mut self, user_id: i64, node_id: &str) -> AppResult<()>;

    /// Unmark a node. Returns whether a marker existed.
    async fn delete_favorite(&mut self, user_id: i64, node_id: &str) -> AppResult<bool>;

    /// Live favorite nodes ordered by name.
    async fn list_favorites(&mut self, user_id: i64, page: &PageRequest) -> AppResult<Vec<Node>>;
}

/// Event journal queries.
#[async_trait]
pub trait JournalQueries: Send {
    /// Append an event for `user_id`, returning its sequence number.
    async fn append_event(
        &mut self,
        user_id: i64,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> AppResult<i64>;

    /// Events of `user_id` with sequence greater than `since`, ascending.
    async fn events_since(
        &mut self,
        user_id: i64,
        since: i64,
        limit: u32,
    ) -> AppResult<Vec<JournalEvent>>;

    /// Delete events older than `cutoff`. Returns the number removed.
    async fn prune_events_before(&mut self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// User queries.
#[async_trait]
pub trait UserQueries: Send {
    /// Insert a user.
    async fn insert_user(&mut self, user: &CreateUser) -> AppResult<User>;

    /// Fetch a user by id.
    async fn find_user(&mut self, id: i64) -> AppResult<Option<User>>;

    /// Fetch a user by username.
    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>>;

    /// Add `delta` (possibly negative) to the used-storage counter,
    /// clamping at zero.
    async fn adjust_storage_used(&mut self, user_id: i64, delta: i64) -> AppResult<()>;

    /// Add `bytes` to the used-storage counter only if the result stays
    /// within the quota. Returns whether the bytes were reserved.
    async fn reserve_storage(&mut self, user_id: i64, bytes: i64) -> AppResult<bool>;
}

/// Session queries.
#[async_trait]
pub trait SessionQueries: Send {
    /// Insert a session.
    async fn insert_session(&mut self, session: &CreateSession) -> AppResult<Session>;

    /// Unexpired session holding `refresh_token`.
    async fn find_session_by_token(&mut self, refresh_token: &str) -> AppResult<Option<Session>>;

    /// Unexpired sessions of a user, newest first.
    async fn list_sessions(&mut self, user_id: i64) -> AppResult<Vec<Session>>;

    /// Delete one session of a user. Returns whether it existed.
    async fn delete_session(&mut self, id: Uuid, user_id: i64) -> AppResult<bool>;

    /// Delete every session of a user. Returns the number removed.
    async fn delete_all_sessions(&mut self, user_id: i64) -> AppResult<u64>;
}

/// One atomic unit of reads and writes.
#[async_trait]
pub trait StoreTransaction:
    NodeQueries + ShareQueries + FavoriteQueries + JournalQueries + UserQueries + SessionQueries
{
    /// Make every change visible.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every change. Dropping the transaction does the same.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
