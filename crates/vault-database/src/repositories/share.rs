//! Share grant queries.

use sqlx::PgConnection;

use vault_core::result::AppResult;
use vault_core::types::PageRequest;
use vault_entity::node::Node;
use vault_entity::share::{CreateShare, OutgoingShare, Share, SharingUser};

use crate::errors::{self, Violation, SHARE_NODE_RECIPIENT_KEY, SHARE_NO_SELF_SHARE};

pub async fn insert(conn: &mut PgConnection, share: &CreateShare) -> AppResult<Share> {
    sqlx::query_as::<_, Share>(
        "INSERT INTO shares (node_id, sharer_id, recipient_id, permissions) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(&share.node_id)
    .bind(share.sharer_id)
    .bind(share.recipient_id)
    .bind(share.permissions)
    .fetch_one(conn)
    .await
    .map_err(|e| match errors::violation(&e) {
        Some(Violation::Unique(Some(SHARE_NODE_RECIPIENT_KEY))) => errors::duplicate_share(),
        Some(Violation::Check(Some(SHARE_NO_SELF_SHARE))) => errors::self_share(),
        Some(Violation::ForeignKey(_)) => errors::share_target_missing(),
        _ => errors::database("Failed to create share", e),
    })
}

pub async fn find(conn: &mut PgConnection, id: i64, sharer_id: i64) -> AppResult<Option<Share>> {
    sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE id = $1 AND sharer_id = $2")
        .bind(id)
        .bind(sharer_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| errors::database("Failed to find share", e))
}

pub async fn delete(conn: &mut PgConnection, id: i64, sharer_id: i64) -> AppResult<Option<Share>> {
    sqlx::query_as::<_, Share>("DELETE FROM shares WHERE id = $1 AND sharer_id = $2 RETURNING *")
        .bind(id)
        .bind(sharer_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| errors::database("Failed to delete share", e))
}

pub async fn list_outgoing(
    conn: &mut PgConnection,
    sharer_id: i64,
    page: &PageRequest,
) -> AppResult<Vec<OutgoingShare>> {
    sqlx::query_as::<_, OutgoingShare>(
        "SELECT s.id, s.node_id, n.name AS node_name, n.node_type, s.recipient_id, \
                u.username AS recipient_username, s.permissions, s.shared_at \
         FROM shares s \
         INNER JOIN nodes n ON n.id = s.node_id \
         INNER JOIN users u ON u.id = s.recipient_id \
         WHERE s.sharer_id = $1 AND n.deleted_at IS NULL \
         ORDER BY s.shared_at DESC, s.id DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(sharer_id)
    .bind(page.limit() as i64)
    .bind(page.offset() as i64)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to list outgoing shares", e))
}

pub async fn list_sharing_users(
    conn: &mut PgConnection,
    recipient_id: i64,
    page: &PageRequest,
) -> AppResult<Vec<SharingUser>> {
    sqlx::query_as::<_, SharingUser>(
        "SELECT DISTINCT u.id, u.username, u.display_name \
         FROM shares s INNER JOIN users u ON u.id = s.sharer_id \
         WHERE s.recipient_id = $1 \
         ORDER BY u.username ASC \
         LIMIT $2 OFFSET $3",
    )
    .bind(recipient_id)
    .bind(page.limit() as i64)
    .bind(page.offset() as i64)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to list sharing users", e))
}

pub async fn list_directly_shared(
    conn: &mut PgConnection,
    recipient_id: i64,
    sharer_id: i64,
    page: &PageRequest,
) -> AppResult<Vec<Node>> {
    sqlx::query_as::<_, Node>(
        "SELECT n.* FROM nodes n INNER JOIN shares s ON s.node_id = n.id \
         WHERE s.recipient_id = $1 AND s.sharer_id = $2 AND n.deleted_at IS NULL \
         ORDER BY (n.node_type = 'folder') DESC, n.name ASC, n.id ASC \
         LIMIT $3 OFFSET $4",
    )
    .bind(recipient_id)
    .bind(sharer_id)
    .bind(page.limit() as i64)
    .bind(page.offset() as i64)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to list shared nodes", e))
}
