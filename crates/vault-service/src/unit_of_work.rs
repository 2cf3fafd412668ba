//! Transaction wrapper that journals events and defers their push until
//! after commit.

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use vault_core::events::{EventEnvelope, EventType};
use vault_core::result::AppResult;
use vault_core::traits::Publisher;
use vault_database::store::JournalQueries;
use vault_database::{Store, StoreTransaction};

use crate::journal::Journal;

/// One store transaction plus the pushes it will trigger.
///
/// Every `?` that leaves a service method drops the unit of work, which
/// rolls the transaction back and discards the queued pushes. Pushes only
/// go out from [`UnitOfWork::commit`], after the store has committed.
pub struct UnitOfWork {
    tx: Box<dyn StoreTransaction>,
    pending: Vec<(i64, Bytes)>,
}

impl UnitOfWork {
    /// Open a transaction.
    pub async fn begin(store: &dyn Store) -> AppResult<Self> {
        Ok(Self {
            tx: store.begin().await?,
            pending: Vec::new(),
        })
    }

    /// The underlying transaction.
    pub fn tx(&mut self) -> &mut dyn StoreTransaction {
        &mut *self.tx
    }

    /// Journal `payload` for every distinct recipient and queue its push.
    ///
    /// The journal row stores the bare payload; the push carries it inside
    /// an [`EventEnvelope`].
    pub async fn record<P>(
        &mut self,
        journal: &Journal,
        recipients: &[i64],
        event_type: EventType,
        payload: &P,
    ) -> AppResult<()>
    where
        P: Serialize + Sync,
    {
        let envelope = EventEnvelope::new(event_type, journal.encode_payload(payload)?);
        let wire = envelope.to_bytes()?;

        for user_id in distinct(recipients) {
            let seq = self
                .tx
                .append_event(user_id, event_type.as_str(), &envelope.payload)
                .await?;
            debug!(user_id, seq, event_type = %event_type, "Journaled event");
            self.pending.push((user_id, wire.clone()));
        }
        Ok(())
    }

    /// Commit, then push every recorded event. Push failures never surface.
    pub async fn commit(self, publisher: &dyn Publisher) -> AppResult<()> {
        let Self { tx, pending } = self;
        tx.commit().await?;
        for (user_id, payload) in pending {
            publisher.publish(user_id, payload);
        }
        Ok(())
    }

    /// Discard everything explicitly.
    pub async fn rollback(self) -> AppResult<()> {
        self.tx.rollback().await
    }
}

/// Recipients in first-seen order without repeats.
pub(crate) fn distinct(recipients: &[i64]) -> Vec<i64> {
    let mut seen = Vec::with_capacity(recipients.len());
    for &id in recipients {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}
