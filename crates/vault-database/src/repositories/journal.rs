//! Event journal queries.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use vault_core::result::AppResult;
use vault_entity::event::JournalEvent;

use crate::errors::{self, Violation};

pub async fn append(
    conn: &mut PgConnection,
    user_id: i64,
    event_type: &str,
    payload: &serde_json::Value,
) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO event_journal (user_id, event_type, payload) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(event_type)
    .bind(payload)
    .fetch_one(conn)
    .await
    .map_err(|e| match errors::violation(&e) {
        Some(Violation::ForeignKey(_)) => errors::user_not_found(),
        _ => errors::database("Failed to append event", e),
    })
}

pub async fn since(
    conn: &mut PgConnection,
    user_id: i64,
    since: i64,
    limit: u32,
) -> AppResult<Vec<JournalEvent>> {
    sqlx::query_as::<_, JournalEvent>(
        "SELECT id, user_id, event_type, event_time, payload FROM event_journal \
         WHERE user_id = $1 AND id > $2 ORDER BY id ASC LIMIT $3",
    )
    .bind(user_id)
    .bind(since)
    .bind(i64::from(limit))
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to read events", e))
}

pub async fn prune_before(conn: &mut PgConnection, cutoff: DateTime<Utc>) -> AppResult<u64> {
    sqlx::query("DELETE FROM event_journal WHERE event_time < $1")
        .bind(cutoff)
        .execute(conn)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| errors::database("Failed to prune events", e))
}
