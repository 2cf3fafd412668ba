//! Notification hub: user id to live connections.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vault_core::config::RealtimeConfig;
use vault_core::error::AppError;
use vault_core::result::AppResult;
use vault_core::traits::Publisher;

use crate::connection::handle::Delivery;
use crate::connection::{ConnectionHandle, ConnectionId, Registration};

type Registry = HashMap<i64, HashMap<ConnectionId, ConnectionHandle>>;

/// Registry of live push connections, keyed by user.
///
/// One mutex guards the whole map. It is held only while the map is
/// read or changed and while payloads are enqueued, never across socket
/// I/O: each connection's writer task owns the receiving half of its
/// queue.
#[derive(Debug)]
pub struct Hub {
    registry: Mutex<Registry>,
    config: RealtimeConfig,
}

impl Hub {
    /// Create an empty hub.
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // Every update is a single map operation; poisoning is ignored.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection for `user_id`.
    ///
    /// Returns the registration and the receiving half of the connection's
    /// bounded outbound queue. Entries whose receiver is already gone are
    /// dropped first and do not count. Fails with `Conflict` when the user
    /// still holds `max_connections_per_user` connections.
    pub fn register(
        &self,
        user_id: i64,
        username: impl Into<String>,
    ) -> AppResult<(Registration, mpsc::Receiver<Bytes>)> {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = ConnectionHandle::new(user_id, username.into(), tx);
        let registration = Registration {
            id: handle.id,
            user_id,
        };

        let mut registry = self.lock();
        let connections = registry.entry(user_id).or_default();
        let before = connections.len();
        connections.retain(|_, h| !h.is_closed());
        let stale = before - connections.len();
        if stale > 0 {
            debug!(user_id, count = stale, "Pruned closed connections");
        }

        let max = self.config.max_connections_per_user;
        if max > 0 && connections.len() >= max {
            let count = connections.len();
            drop(registry);
            warn!(user_id, count, max, "Refusing connection over per-user limit");
            return Err(AppError::conflict(format!(
                "User already has {count} live connections"
            )));
        }
        info!(
            conn_id = %handle.id,
            user_id,
            username = %handle.username,
            "Connection registered"
        );
        connections.insert(handle.id, handle);

        Ok((registration, rx))
    }

    /// Remove a connection. Its outbound queue closes, which ends its
    /// writer task. Returns `false` if it was already gone.
    pub fn unregister(&self, registration: &Registration) -> bool {
        let mut registry = self.lock();
        let Some(connections) = registry.get_mut(&registration.user_id) else {
            return false;
        };
        let removed = connections.remove(&registration.id).is_some();
        if connections.is_empty() {
            registry.remove(&registration.user_id);
        }
        drop(registry);

        if removed {
            info!(
                conn_id = %registration.id,
                user_id = registration.user_id,
                "Connection unregistered"
            );
        }
        removed
    }

    /// Remove every connection of `user_id`, returning how many there were.
    pub fn disconnect_user(&self, user_id: i64) -> usize {
        let removed = self.lock().remove(&user_id).map_or(0, |c| c.len());
        if removed > 0 {
            info!(user_id, connections = removed, "Disconnected user");
        }
        removed
    }

    /// Enqueue `payload` on every connection of `user_id` without waiting.
    ///
    /// A full queue drops the payload for that connection only. Connections
    /// whose writer is gone are removed. Returns the number of connections
    /// that accepted the payload.
    pub fn publish(&self, user_id: i64, payload: Bytes) -> usize {
        let mut registry = self.lock();
        let Some(connections) = registry.get_mut(&user_id) else {
            return 0;
        };

        let mut queued = 0;
        let mut closed = Vec::new();
        for (id, handle) in connections.iter() {
            match handle.try_deliver(payload.clone()) {
                Delivery::Queued => queued += 1,
                Delivery::Dropped => {
                    warn!(conn_id = %id, user_id, "Outbound queue full, dropping message");
                }
                Delivery::Closed => closed.push(*id),
            }
        }
        for id in &closed {
            connections.remove(id);
        }
        if connections.is_empty() {
            registry.remove(&user_id);
        }
        drop(registry);

        if !closed.is_empty() {
            debug!(user_id, count = closed.len(), "Pruned closed connections");
        }
        queued
    }

    /// Live connections of one user.
    pub fn connection_count(&self, user_id: i64) -> usize {
        self.lock().get(&user_id).map_or(0, |c| c.len())
    }

    /// Users with at least one live connection.
    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    /// Total live connections.
    pub fn total_connections(&self) -> usize {
        self.lock().values().map(HashMap::len).sum()
    }
}

impl Publisher for Hub {
    fn publish(&self, user_id: i64, payload: Bytes) {
        Hub::publish(self, user_id, payload);
    }

    fn disconnect_user(&self, user_id: i64) {
        Hub::disconnect_user(self, user_id);
    }
}
