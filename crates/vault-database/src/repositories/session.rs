//! Session queries.

use sqlx::PgConnection;
use uuid::Uuid;

use vault_core::result::AppResult;
use vault_entity::session::{CreateSession, Session};

use crate::errors::{self, Violation};

pub async fn insert(conn: &mut PgConnection, session: &CreateSession) -> AppResult<Session> {
    sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (id, user_id, refresh_token, user_agent, client_ip, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(session.id)
    .bind(session.user_id)
    .bind(&session.refresh_token)
    .bind(&session.user_agent)
    .bind(&session.client_ip)
    .bind(session.expires_at)
    .fetch_one(conn)
    .await
    .map_err(|e| match errors::violation(&e) {
        Some(Violation::Unique(_)) => errors::duplicate_refresh_token(),
        Some(Violation::ForeignKey(_)) => errors::user_not_found(),
        _ => errors::database("Failed to create session", e),
    })
}

pub async fn find_by_token(conn: &mut PgConnection, refresh_token: &str) -> AppResult<Option<Session>> {
    sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions WHERE refresh_token = $1 AND expires_at > now()",
    )
    .bind(refresh_token)
    .fetch_optional(conn)
    .await
    .map_err(|e| errors::database("Failed to find session", e))
}

pub async fn list_for_user(conn: &mut PgConnection, user_id: i64) -> AppResult<Vec<Session>> {
    sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions WHERE user_id = $1 AND expires_at > now() \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to list sessions", e))
}

pub async fn delete(conn: &mut PgConnection, id: Uuid, user_id: i64) -> AppResult<bool> {
    sqlx::query("DELETE FROM sessions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(conn)
        .await
        .map(|r| r.rows_affected() > 0)
        .map_err(|e| errors::database("Failed to delete session", e))
}

pub async fn delete_all_for_user(conn: &mut PgConnection, user_id: i64) -> AppResult<u64> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .map(|r| r.rows_affected())
        .map_err(|e| errors::database("Failed to delete sessions", e))
}
