//! Journal encoding rules and the read/retention side of the journal.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use vault_core::config::JournalConfig;
use vault_core::error::AppError;
use vault_core::result::AppResult;
use vault_database::Store;
use vault_database::store::JournalQueries;
use vault_entity::event::JournalEvent;

use crate::context::RequestContext;

/// Hard upper bound on a `read_since` page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Journal encoding rules shared by every writer.
#[derive(Debug, Clone)]
pub struct Journal {
    config: JournalConfig,
}

impl Journal {
    /// Create the journal rules from configuration.
    pub fn new(config: JournalConfig) -> Self {
        Self { config }
    }

    /// Serialize a payload, rejecting it when it exceeds the configured
    /// size. The rejection aborts the caller's transaction.
    pub fn encode_payload<P: Serialize>(&self, payload: &P) -> AppResult<serde_json::Value> {
        let value = serde_json::to_value(payload)?;
        let size = serde_json::to_vec(&value)?.len();
        if size > self.config.max_payload_bytes {
            return Err(AppError::validation(format!(
                "Event payload of {size} bytes exceeds the {} byte limit",
                self.config.max_payload_bytes
            )));
        }
        Ok(value)
    }

    /// Effective page size: configured value, capped at [`MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> u32 {
        self.config.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Retention cutoff relative to `now`, when retention is enabled.
    pub fn retention_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.config
            .retention_days
            .map(|days| now - Duration::days(i64::from(days)))
    }
}

/// Reads and prunes the journal.
#[derive(Clone)]
pub struct JournalService {
    store: Arc<dyn Store>,
    journal: Arc<Journal>,
}

impl std::fmt::Debug for JournalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalService").finish()
    }
}

impl JournalService {
    /// Creates a new journal service.
    pub fn new(store: Arc<dyn Store>, journal: Arc<Journal>) -> Self {
        Self { store, journal }
    }

    /// Events addressed to the caller with a sequence strictly greater
    /// than `since`, oldest first, one page at a time.
    pub async fn events_since(
        &self,
        ctx: &RequestContext,
        since: i64,
    ) -> AppResult<Vec<JournalEvent>> {
        self.read_since(ctx.user_id, since, self.journal.page_size())
            .await
    }

    /// Events of `user_id` after `since`, at most `limit` (itself capped
    /// at [`MAX_PAGE_SIZE`]).
    pub async fn read_since(
        &self,
        user_id: i64,
        since: i64,
        limit: u32,
    ) -> AppResult<Vec<JournalEvent>> {
        let mut tx = self.store.begin().await?;
        let events = tx
            .events_since(user_id, since.max(0), limit.clamp(1, MAX_PAGE_SIZE))
            .await?;
        tx.rollback().await?;
        Ok(events)
    }

    /// Delete every event older than `cutoff`.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut tx = self.store.begin().await?;
        let removed = tx.prune_events_before(cutoff).await?;
        tx.commit().await?;
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Pruned journal events");
        }
        Ok(removed)
    }

    /// Apply the configured retention window. `None` when retention is off.
    pub async fn prune_expired(&self) -> AppResult<Option<u64>> {
        match self.journal.retention_cutoff(Utc::now()) {
            Some(cutoff) => self.prune_before(cutoff).await.map(Some),
            None => Ok(None),
        }
    }
}
