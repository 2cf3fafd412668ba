//! In-memory store for tests and single-node experiments.
//!
//! Transactions are serialized behind one Tokio mutex. A transaction keeps
//! a snapshot of the state taken at `begin` and writes it back unless it
//! is committed, which gives the same all-or-nothing behavior as the
//! PostgreSQL store. Constraint violations raise the same errors the
//! PostgreSQL repositories map to.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use vault_core::result::AppResult;
use vault_core::types::PageRequest;
use vault_entity::event::JournalEvent;
use vault_entity::node::{AncestorLink, NewNode, Node, NodeType, PurgeOutcome};
use vault_entity::session::{CreateSession, Session};
use vault_entity::share::{CreateShare, OutgoingShare, Share, SharingUser};
use vault_entity::user::{CreateUser, User};

use super::{
    FavoriteQueries, JournalQueries, MAX_TREE_DEPTH, NodeQueries, SessionQueries, ShareQueries,
    Store, StoreTransaction, UserQueries,
};
use crate::errors;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    nodes: HashMap<String, Node>,
    shares: BTreeMap<i64, Share>,
    favorites: BTreeMap<(i64, String), DateTime<Utc>>,
    events: Vec<JournalEvent>,
    sessions: HashMap<Uuid, Session>,
    last_user_id: i64,
    last_share_id: i64,
    last_event_id: i64,
}

impl MemoryState {
    fn live_sibling_taken(
        &self,
        owner_id: i64,
        parent_id: Option<&str>,
        name: &str,
        except: Option<&str>,
    ) -> bool {
        self.nodes.values().any(|n| {
            n.is_live()
                && n.owner_id == owner_id
                && n.parent_id.as_deref() == parent_id
                && n.name == name
                && Some(n.id.as_str()) != except
        })
    }

    fn live_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id).filter(|n| n.is_live())
    }

    /// Remove nodes and everything that references them.
    fn cascade_delete_nodes(&mut self, mut doomed: Vec<String>) -> Vec<Node> {
        let mut removed = Vec::new();
        while let Some(id) = doomed.pop() {
            let Some(node) = self.nodes.remove(&id) else {
                continue;
            };
            doomed.extend(
                self.nodes
                    .values()
                    .filter(|n| n.parent_id.as_deref() == Some(id.as_str()))
                    .map(|n| n.id.clone()),
            );
            self.shares.retain(|_, s| s.node_id != id);
            self.favorites.retain(|(_, node_id), _| *node_id != id);
            removed.push(node);
        }
        removed
    }

    fn paged<T>(rows: Vec<T>, page: &PageRequest) -> Vec<T> {
        rows.into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect()
    }

    fn sorted_folders_first(mut nodes: Vec<Node>) -> Vec<Node> {
        nodes.sort_by(|a, b| {
            b.is_folder()
                .cmp(&a.is_folder())
                .then_with(|| a.name.cmp(&b.name))
        });
        nodes
    }
}

/// Store keeping all state in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTransaction {
            state: guard,
            snapshot: Some(snapshot),
            now: Utc::now(),
        }))
    }
}

/// An open in-memory transaction.
///
/// `now` is fixed at `begin`, like PostgreSQL's `now()`, so every row a
/// transaction touches carries the same timestamp.
pub struct MemoryTransaction {
    state: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
    now: DateTime<Utc>,
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }
}

#[async_trait]
impl NodeQueries for MemoryTransaction {
    async fn insert_node(&mut self, new: &NewNode) -> AppResult<Node> {
        let state = &mut *self.state;
        if state.nodes.contains_key(&new.id) {
            return Err(errors::node_id_taken(&new.id));
        }
        if let Some(parent_id) = &new.parent_id {
            if state.live_node(parent_id).is_none() {
                return Err(errors::parent_not_found());
            }
        }
        if !state.users.contains_key(&new.owner_id) {
            return Err(errors::user_not_found());
        }
        if state.live_sibling_taken(new.owner_id, new.parent_id.as_deref(), &new.name, None) {
            return Err(errors::duplicate_name(&new.name));
        }

        let node = Node {
            id: new.id.clone(),
            owner_id: new.owner_id,
            parent_id: new.parent_id.clone(),
            name: new.name.clone(),
            node_type: new.node_type,
            size_bytes: new.size_bytes,
            mime_type: new.mime_type.clone(),
            created_at: self.now,
            modified_at: self.now,
            deleted_at: None,
            original_parent_id: None,
        };
        state.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn node_exists(&mut self, id: &str) -> AppResult<bool> {
        Ok(self.state.nodes.contains_key(id))
    }

    async fn find_node(&mut self, id: &str) -> AppResult<Option<Node>> {
        Ok(self.state.nodes.get(id).cloned())
    }

    async fn find_live_node(&mut self, id: &str) -> AppResult<Option<Node>> {
        Ok(self.state.live_node(id).cloned())
    }

    async fn list_children(
        &mut self,
        owner_id: i64,
        parent_id: Option<&str>,
        page: &PageRequest,
    ) -> AppResult<Vec<Node>> {
        let children = self
            .state
            .nodes
            .values()
            .filter(|n| n.is_live() && n.owner_id == owner_id && n.parent_id.as_deref() == parent_id)
            .cloned()
            .collect();
        Ok(MemoryState::paged(
            MemoryState::sorted_folders_first(children),
            page,
        ))
    }

    async fn rename_node(
        &mut self,
        id: &str,
        owner_id: i64,
        new_name: &str,
    ) -> AppResult<Option<Node>> {
        let now = self.now;
        let state = &mut *self.state;
        let Some(parent_id) = state
            .live_node(id)
            .filter(|n| n.owner_id == owner_id)
            .map(|n| n.parent_id.clone())
        else {
            return Ok(None);
        };
        if state.live_sibling_taken(owner_id, parent_id.as_deref(), new_name, Some(id)) {
            return Err(errors::duplicate_name(new_name));
        }
        let Some(node) = state.nodes.get_mut(id) else {
            return Ok(None);
        };
        node.name = new_name.to_string();
        node.modified_at = now;
        Ok(Some(node.clone()))
    }

    async fn move_node(
        &mut self,
        id: &str,
        owner_id: i64,
        new_parent_id: Option<&str>,
    ) -> AppResult<Option<Node>> {
        let now = self.now;
        let state = &mut *self.state;
        let Some(name) = state
            .live_node(id)
            .filter(|n| n.owner_id == owner_id)
            .map(|n| n.name.clone())
        else {
            return Ok(None);
        };
        if let Some(parent_id) = new_parent_id {
            if !state.nodes.contains_key(parent_id) {
                return Err(errors::parent_not_found());
            }
        }
        if state.live_sibling_taken(owner_id, new_parent_id, &name, Some(id)) {
            return Err(errors::duplicate_name(&name));
        }
        let Some(node) = state.nodes.get_mut(id) else {
            return Ok(None);
        };
        node.parent_id = new_parent_id.map(str::to_string);
        node.modified_at = now;
        Ok(Some(node.clone()))
    }

    async fn trash_subtree(&mut self, id: &str, owner_id: i64) -> AppResult<Vec<String>> {
        let now = self.now;
        let state = &mut *self.state;
        if state.live_node(id).filter(|n| n.owner_id == owner_id).is_none() {
            return Ok(Vec::new());
        }

        let mut subtree = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < subtree.len() {
            let current = subtree[cursor].clone();
            subtree.extend(
                state
                    .nodes
                    .values()
                    .filter(|n| n.is_live() && n.parent_id.as_deref() == Some(current.as_str()))
                    .map(|n| n.id.clone()),
            );
            cursor += 1;
        }

        for member in &subtree {
            if let Some(node) = state.nodes.get_mut(member) {
                node.deleted_at = Some(now);
                node.original_parent_id = node.parent_id.take();
            }
        }
        Ok(subtree)
    }

    async fn restore_subtree(
        &mut self,
        id: &str,
        owner_id: i64,
        destination: Option<&str>,
    ) -> AppResult<Option<Node>> {
        let state = &mut *self.state;
        let Some(root) = state
            .nodes
            .get(id)
            .filter(|n| n.owner_id == owner_id && !n.is_live())
            .cloned()
        else {
            return Ok(None);
        };

        if let Some(parent_id) = destination {
            if !state.nodes.contains_key(parent_id) {
                return Err(errors::parent_not_found());
            }
        }
        if state.live_sibling_taken(owner_id, destination, &root.name, None) {
            return Err(errors::duplicate_name(&root.name));
        }

        let mut batch = vec![root.id.clone()];
        let mut cursor = 0;
        while cursor < batch.len() {
            let current = batch[cursor].clone();
            batch.extend(
                state
                    .nodes
                    .values()
                    .filter(|n| {
                        n.owner_id == owner_id
                            && n.deleted_at == root.deleted_at
                            && n.original_parent_id.as_deref() == Some(current.as_str())
                    })
                    .map(|n| n.id.clone()),
            );
            cursor += 1;
        }

        for member in &batch {
            if let Some(node) = state.nodes.get_mut(member) {
                node.parent_id = if node.id == root.id {
                    destination.map(str::to_string)
                } else {
                    node.original_parent_id.clone()
                };
                node.original_parent_id = None;
                node.deleted_at = None;
            }
        }
        Ok(state.nodes.get(id).cloned())
    }

    async fn list_trash(&mut self, owner_id: i64, page: &PageRequest) -> AppResult<Vec<Node>> {
        let state = &*self.state;
        let mut roots: Vec<Node> = state
            .nodes
            .values()
            .filter(|n| n.owner_id == owner_id && !n.is_live())
            .filter(|n| {
                let same_batch_parent = n
                    .original_parent_id
                    .as_deref()
                    .and_then(|p| state.nodes.get(p))
                    .is_some_and(|p| p.deleted_at == n.deleted_at);
                !same_batch_parent
            })
            .cloned()
            .collect();
        roots.sort_by(|a, b| {
            b.deleted_at
                .cmp(&a.deleted_at)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(MemoryState::paged(roots, page))
    }

    async fn purge_trash(&mut self, owner_id: i64) -> AppResult<PurgeOutcome> {
        let doomed: Vec<String> = self
            .state
            .nodes
            .values()
            .filter(|n| n.owner_id == owner_id && !n.is_live())
            .map(|n| n.id.clone())
            .collect();

        let mut outcome = PurgeOutcome::default();
        for node in self.state.cascade_delete_nodes(doomed) {
            outcome.purged_count += 1;
            if node.node_type == NodeType::File {
                outcome.bytes_freed += node.content_bytes();
                outcome.file_ids.push(node.id);
            }
        }
        Ok(outcome)
    }

    async fn ancestor_chain(
        &mut self,
        node_id: &str,
        principal_id: i64,
    ) -> AppResult<Vec<AncestorLink>> {
        let state = &*self.state;
        let mut chain = Vec::new();
        let mut cursor = state.live_node(node_id);
        let mut depth = 0;
        while let Some(node) = cursor {
            if depth > MAX_TREE_DEPTH {
                break;
            }
            let permission = state
                .shares
                .values()
                .find(|s| s.node_id == node.id && s.recipient_id == principal_id)
                .map(|s| s.permissions);
            chain.push(AncestorLink {
                node_id: node.id.clone(),
                owner_id: node.owner_id,
                depth,
                permission,
            });
            cursor = node.parent_id.as_deref().and_then(|p| state.nodes.get(p));
            depth += 1;
        }
        Ok(chain)
    }
}

#[async_trait]
impl ShareQueries for MemoryTransaction {
    async fn insert_share(&mut self, new: &CreateShare) -> AppResult<Share> {
        let now = self.now;
        let state = &mut *self.state;
        if new.sharer_id == new.recipient_id {
            return Err(errors::self_share());
        }
        if !state.nodes.contains_key(&new.node_id)
            || !state.users.contains_key(&new.sharer_id)
            || !state.users.contains_key(&new.recipient_id)
        {
            return Err(errors::share_target_missing());
        }
        if state
            .shares
            .values()
            .any(|s| s.node_id == new.node_id && s.recipient_id == new.recipient_id)
        {
            return Err(errors::duplicate_share());
        }

        state.last_share_id += 1;
        let share = Share {
            id: state.last_share_id,
            node_id: new.node_id.clone(),
            sharer_id: new.sharer_id,
            recipient_id: new.recipient_id,
            permissions: new.permissions,
            shared_at: now,
        };
        state.shares.insert(share.id, share.clone());
        Ok(share)
    }

    async fn find_share(&mut self, id: i64, sharer_id: i64) -> AppResult<Option<Share>> {
        Ok(self
            .state
            .shares
            .get(&id)
            .filter(|s| s.sharer_id == sharer_id)
            .cloned())
    }

    async fn delete_share(&mut self, id: i64, sharer_id: i64) -> AppResult<Option<Share>> {
        let owned = self
            .state
            .shares
            .get(&id)
            .is_some_and(|s| s.sharer_id == sharer_id);
        Ok(if owned { self.state.shares.remove(&id) } else { None })
    }

    async fn list_outgoing_shares(
        &mut self,
        sharer_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<OutgoingShare>> {
        let state = &*self.state;
        let mut rows: Vec<OutgoingShare> = state
            .shares
            .values()
            .filter(|s| s.sharer_id == sharer_id)
            .filter_map(|s| {
                let node = state.live_node(&s.node_id)?;
                let recipient = state.users.get(&s.recipient_id)?;
                Some(OutgoingShare {
                    id: s.id,
                    node_id: s.node_id.clone(),
                    node_name: node.name.clone(),
                    node_type: node.node_type,
                    recipient_id: s.recipient_id,
                    recipient_username: recipient.username.clone(),
                    permissions: s.permissions,
                    shared_at: s.shared_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.shared_at.cmp(&a.shared_at).then_with(|| b.id.cmp(&a.id)));
        Ok(MemoryState::paged(rows, page))
    }

    async fn list_sharing_users(
        &mut self,
        recipient_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<SharingUser>> {
        let state = &*self.state;
        let sharers: HashSet<i64> = state
            .shares
            .values()
            .filter(|s| s.recipient_id == recipient_id)
            .map(|s| s.sharer_id)
            .collect();
        let mut users: Vec<SharingUser> = sharers
            .into_iter()
            .filter_map(|id| state.users.get(&id))
            .map(|u| SharingUser {
                id: u.id,
                username: u.username.clone(),
                display_name: u.display_name.clone(),
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(MemoryState::paged(users, page))
    }

    async fn list_directly_shared(
        &mut self,
        recipient_id: i64,
        sharer_id: i64,
        page: &PageRequest,
    ) -> AppResult<Vec<Node>> {
        let state = &*self.state;
        let nodes = state
            .shares
            .values()
            .filter(|s| s.recipient_id == recipient_id && s.sharer_id == sharer_id)
            .filter_map(|s| state.live_node(&s.node_id).cloned())
            .collect();
        Ok(MemoryState::paged(
            MemoryState::sorted_folders_first(nodes),
            page,
        ))
    }
}

#[async_trait]
impl FavoriteQueries for MemoryTransaction {
    async fn insert_favorite(&mut self, user_id: i64, node_id: &str) -> AppResult<()> {
        let now = self.now;
        let state = &mut *self.state;
        if !state.nodes.contains_key(node_id) || !state.users.contains_key(&user_id) {
            return Err(errors::node_not_found());
        }
        let key = (user_id, node_id.to_string());
        if state.favorites.contains_key(&key) {
            return Err(errors::already_favorited());
        }
        state.favorites.insert(key, now);
        Ok(())
    }

    async fn delete_favorite(&mut self, user_id: i64, node_id: &str) -> AppResult<bool> {
        Ok(self
            .state
            .favorites
            .remove(&(user_id, node_id.to_string()))
            .is_some())
    }

    async fn list_favorites(&mut self, user_id: i64, page: &PageRequest) -> AppResult<Vec<Node>> {
        let state = &*self.state;
        let mut nodes: Vec<Node> = state
            .favorites
            .keys()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, node_id)| state.live_node(node_id).cloned())
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(MemoryState::paged(nodes, page))
    }
}

#[async_trait]
impl JournalQueries for MemoryTransaction {
    async fn append_event(
        &mut self,
        user_id: i64,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> AppResult<i64> {
        let now = self.now;
        let state = &mut *self.state;
        if !state.users.contains_key(&user_id) {
            return Err(errors::user_not_found());
        }
        state.last_event_id += 1;
        state.events.push(JournalEvent {
            id: state.last_event_id,
            user_id,
            event_type: event_type.to_string(),
            event_time: now,
            payload: payload.clone(),
        });
        Ok(state.last_event_id)
    }

    async fn events_since(
        &mut self,
        user_id: i64,
        since: i64,
        limit: u32,
    ) -> AppResult<Vec<JournalEvent>> {
        // Appended in id order, so no sort is needed.
        Ok(self
            .state
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.id > since)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn prune_events_before(&mut self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let before = self.state.events.len();
        self.state.events.retain(|e| e.event_time >= cutoff);
        Ok((before - self.state.events.len()) as u64)
    }
}

#[async_trait]
impl UserQueries for MemoryTransaction {
    async fn insert_user(&mut self, new: &CreateUser) -> AppResult<User> {
        let now = self.now;
        let state = &mut *self.state;
        if state.users.values().any(|u| u.username == new.username) {
            return Err(errors::duplicate_username(&new.username));
        }
        state.last_user_id += 1;
        let user = User {
            id: state.last_user_id,
            username: new.username.clone(),
            display_name: new.display_name.clone(),
            created_at: now,
            storage_quota_bytes: new.storage_quota_bytes,
            storage_used_bytes: 0,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&mut self, id: i64) -> AppResult<Option<User>> {
        Ok(self.state.users.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn adjust_storage_used(&mut self, user_id: i64, delta: i64) -> AppResult<()> {
        let user = self
            .state
            .users
            .get_mut(&user_id)
            .ok_or_else(errors::user_not_found)?;
        user.storage_used_bytes = (user.storage_used_bytes + delta).max(0);
        Ok(())
    }

    async fn reserve_storage(&mut self, user_id: i64, bytes: i64) -> AppResult<bool> {
        let user = self
            .state
            .users
            .get_mut(&user_id)
            .ok_or_else(errors::user_not_found)?;
        if user.would_exceed_quota(bytes) {
            return Ok(false);
        }
        user.storage_used_bytes += bytes;
        Ok(true)
    }
}

#[async_trait]
impl SessionQueries for MemoryTransaction {
    async fn insert_session(&mut self, new: &CreateSession) -> AppResult<Session> {
        let now = self.now;
        let state = &mut *self.state;
        if !state.users.contains_key(&new.user_id) {
            return Err(errors::user_not_found());
        }
        if state
            .sessions
            .values()
            .any(|s| s.refresh_token == new.refresh_token)
        {
            return Err(errors::duplicate_refresh_token());
        }
        let session = Session {
            id: new.id,
            user_id: new.user_id,
            refresh_token: new.refresh_token.clone(),
            user_agent: new.user_agent.clone(),
            client_ip: new.client_ip.clone(),
            expires_at: new.expires_at,
            created_at: now,
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session_by_token(&mut self, refresh_token: &str) -> AppResult<Option<Session>> {
        let now = self.now;
        Ok(self
            .state
            .sessions
            .values()
            .find(|s| s.refresh_token == refresh_token && !s.is_expired_at(now))
            .cloned())
    }

    async fn list_sessions(&mut self, user_id: i64) -> AppResult<Vec<Session>> {
        let now = self.now;
        let mut sessions: Vec<Session> = self
            .state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && !s.is_expired_at(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn delete_session(&mut self, id: Uuid, user_id: i64) -> AppResult<bool> {
        let owned = self
            .state
            .sessions
            .get(&id)
            .is_some_and(|s| s.user_id == user_id);
        if owned {
            self.state.sessions.remove(&id);
        }
        Ok(owned)
    }

    async fn delete_all_sessions(&mut self, user_id: i64) -> AppResult<u64> {
        let before = self.state.sessions.len();
        self.state.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - self.state.sessions.len()) as u64)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
