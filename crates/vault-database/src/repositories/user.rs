//! User queries.

use sqlx::PgConnection;

use vault_core::result::AppResult;
use vault_entity::user::{CreateUser, User};

use crate::errors::{self, Violation, USERNAME_KEY};

pub async fn insert(conn: &mut PgConnection, user: &CreateUser) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, display_name, storage_quota_bytes) \
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&user.username)
    .bind(&user.display_name)
    .bind(user.storage_quota_bytes)
    .fetch_one(conn)
    .await
    .map_err(|e| match errors::violation(&e) {
        Some(Violation::Unique(Some(USERNAME_KEY))) => errors::duplicate_username(&user.username),
        _ => errors::database("Failed to create user", e),
    })
}

pub async fn find(conn: &mut PgConnection, id: i64) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| errors::database("Failed to find user", e))
}

pub async fn find_by_username(conn: &mut PgConnection, username: &str) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(conn)
        .await
        .map_err(|e| errors::database("Failed to find user by username", e))
}

pub async fn adjust_storage_used(conn: &mut PgConnection, user_id: i64, delta: i64) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE users SET storage_used_bytes = GREATEST(0, storage_used_bytes + $2) WHERE id = $1",
    )
    .bind(user_id)
    .bind(delta)
    .execute(conn)
    .await
    .map_err(|e| errors::database("Failed to update storage usage", e))?;

    if result.rows_affected() == 0 {
        return Err(errors::user_not_found());
    }
    Ok(())
}

pub async fn reserve_storage(conn: &mut PgConnection, user_id: i64, bytes: i64) -> AppResult<bool> {
    // Row lock on the user serializes concurrent reservations.
    let result = sqlx::query(
        "UPDATE users SET storage_used_bytes = storage_used_bytes + $2 \
         WHERE id = $1 AND storage_used_bytes + $2 <= storage_quota_bytes",
    )
    .bind(user_id)
    .bind(bytes)
    .execute(conn)
    .await
    .map_err(|e| errors::database("Failed to reserve storage", e))?;

    Ok(result.rows_affected() == 1)
}
