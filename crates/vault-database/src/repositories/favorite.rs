//! Favorite marker queries.

use sqlx::PgConnection;

use vault_core::result::AppResult;
use vault_core::types::PageRequest;
use vault_entity::node::Node;

use crate::errors::{self, Violation, FAVORITE_PKEY};

pub async fn insert(conn: &mut PgConnection, user_id: i64, node_id: &str) -> AppResult<()> {
    sqlx::query("INSERT INTO user_favorites (user_id, node_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(node_id)
        .execute(conn)
        .await
        .map(|_| ())
        .map_err(|e| match errors::violation(&e) {
            Some(Violation::Unique(Some(FAVORITE_PKEY))) => errors::already_favorited(),
            Some(Violation::ForeignKey(_)) => errors::node_not_found(),
            _ => errors::database("Failed to add favorite", e),
        })
}

pub async fn delete(conn: &mut PgConnection, user_id: i64, node_id: &str) -> AppResult<bool> {
    sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND node_id = $2")
        .bind(user_id)
        .bind(node_id)
        .execute(conn)
        .await
        .map(|r| r.rows_affected() > 0)
        .map_err(|e| errors::database("Failed to remove favorite", e))
}

pub async fn list(conn: &mut PgConnection, user_id: i64, page: &PageRequest) -> AppResult<Vec<Node>> {
    sqlx::query_as::<_, Node>(
        "SELECT n.* FROM nodes n INNER JOIN user_favorites f ON f.node_id = n.id \
         WHERE f.user_id = $1 AND n.deleted_at IS NULL \
         ORDER BY n.name ASC, n.id ASC \
         LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(page.limit() as i64)
    .bind(page.offset() as i64)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to list favorites", e))
}
