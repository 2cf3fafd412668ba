//! Node tree queries.

use sqlx::PgConnection;

use vault_core::result::AppResult;
use vault_core::types::PageRequest;
use vault_entity::node::{AncestorLink, NewNode, Node, NodeType, PurgeOutcome};

use crate::errors::{self, Violation, NODE_PKEY, NODE_SIBLING_NAME_KEY};
use crate::store::MAX_TREE_DEPTH;

/// Translate a write failure on `nodes` into the tree's typed errors.
fn map_write_error(
    err: sqlx::Error,
    id: &str,
    name: &str,
    context: &'static str,
) -> vault_core::AppError {
    match errors::violation(&err) {
        Some(Violation::Unique(Some(NODE_PKEY))) => errors::node_id_taken(id),
        Some(Violation::Unique(_)) => errors::duplicate_name(name),
        Some(Violation::ForeignKey(_)) => errors::parent_not_found(),
        _ => errors::database(context, err),
    }
}

/// Insert under a live parent. The parent row is locked `FOR SHARE`, so a
/// concurrent trash waits for this transaction and then sees the new row.
pub async fn insert(conn: &mut PgConnection, node: &NewNode) -> AppResult<Node> {
    sqlx::query_as::<_, Node>(
        "INSERT INTO nodes (id, owner_id, parent_id, name, node_type, size_bytes, mime_type) \
         SELECT $1, $2, $3, $4, $5, $6, $7 \
         WHERE $3::text IS NULL OR EXISTS ( \
            SELECT 1 FROM nodes p WHERE p.id = $3 AND p.deleted_at IS NULL FOR SHARE \
         ) \
         RETURNING *",
    )
    .bind(&node.id)
    .bind(node.owner_id)
    .bind(&node.parent_id)
    .bind(&node.name)
    .bind(node.node_type)
    .bind(node.size_bytes)
    .bind(&node.mime_type)
    .fetch_optional(conn)
    .await
    .map_err(|e| map_write_error(e, &node.id, &node.name, "Failed to create node"))?
    .ok_or_else(errors::parent_not_found)
}

pub async fn exists(conn: &mut PgConnection, id: &str) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM nodes WHERE id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await
        .map_err(|e| errors::database("Failed to check node id", e))
}

pub async fn find(conn: &mut PgConnection, id: &str) -> AppResult<Option<Node>> {
    sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| errors::database("Failed to find node", e))
}

pub async fn find_live(conn: &mut PgConnection, id: &str) -> AppResult<Option<Node>> {
    sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = $1 AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| errors::database("Failed to find node", e))
}

pub async fn list_children(
    conn: &mut PgConnection,
    owner_id: i64,
    parent_id: Option<&str>,
    page: &PageRequest,
) -> AppResult<Vec<Node>> {
    sqlx::query_as::<_, Node>(
        "SELECT * FROM nodes \
         WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND deleted_at IS NULL \
         ORDER BY (node_type = 'folder') DESC, name ASC \
         LIMIT $3 OFFSET $4",
    )
    .bind(owner_id)
    .bind(parent_id)
    .bind(page.limit() as i64)
    .bind(page.offset() as i64)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to list children", e))
}

pub async fn rename(
    conn: &mut PgConnection,
    id: &str,
    owner_id: i64,
    new_name: &str,
) -> AppResult<Option<Node>> {
    sqlx::query_as::<_, Node>(
        "UPDATE nodes SET name = $3, modified_at = now() \
         WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL RETURNING *",
    )
    .bind(id)
    .bind(owner_id)
    .bind(new_name)
    .fetch_optional(conn)
    .await
    .map_err(|e| map_write_error(e, id, new_name, "Failed to rename node"))
}

pub async fn move_to(
    conn: &mut PgConnection,
    id: &str,
    owner_id: i64,
    new_parent_id: Option<&str>,
) -> AppResult<Option<Node>> {
    // Only used for the conflict message.
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM nodes WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| errors::database("Failed to move node", e))?;
    let name = name.unwrap_or_default();

    sqlx::query_as::<_, Node>(
        "UPDATE nodes SET parent_id = $3, modified_at = now() \
         WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL RETURNING *",
    )
    .bind(id)
    .bind(owner_id)
    .bind(new_parent_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| map_write_error(e, id, &name, "Failed to move node"))
}

pub async fn trash_subtree(
    conn: &mut PgConnection,
    id: &str,
    owner_id: i64,
) -> AppResult<Vec<String>> {
    // Lock the subtree first. An insert holding a parent `FOR SHARE` makes
    // this wait; the update below then runs on a fresh snapshot that
    // includes the inserted row.
    sqlx::query(
        "WITH RECURSIVE subtree AS ( \
            SELECT id FROM nodes WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL \
            UNION ALL \
            SELECT n.id FROM nodes n INNER JOIN subtree s ON n.parent_id = s.id \
            WHERE n.deleted_at IS NULL \
         ) \
         SELECT n.id FROM nodes n INNER JOIN subtree s ON s.id = n.id FOR UPDATE OF n",
    )
    .bind(id)
    .bind(owner_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| errors::database("Failed to lock subtree", e))?;

    sqlx::query_scalar::<_, String>(
        "WITH RECURSIVE subtree AS ( \
            SELECT id FROM nodes WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL \
            UNION ALL \
            SELECT n.id FROM nodes n INNER JOIN subtree s ON n.parent_id = s.id \
            WHERE n.deleted_at IS NULL \
         ) \
         UPDATE nodes SET deleted_at = now(), original_parent_id = parent_id, parent_id = NULL \
         WHERE id IN (SELECT id FROM subtree) \
         RETURNING id",
    )
    .bind(id)
    .bind(owner_id)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to move node to trash", e))
}

pub async fn restore_subtree(
    conn: &mut PgConnection,
    id: &str,
    owner_id: i64,
    destination: Option<&str>,
) -> AppResult<Option<Node>> {
    let name: Option<String> = sqlx::query_scalar(
        "SELECT name FROM nodes WHERE id = $1 AND owner_id = $2 AND deleted_at IS NOT NULL",
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| errors::database("Failed to restore node", e))?;
    let Some(name) = name else {
        return Ok(None);
    };

    // Members of the same trash batch share the batch's deletion timestamp.
    let restored = sqlx::query_as::<_, Node>(
        "WITH RECURSIVE batch AS ( \
            SELECT id, deleted_at FROM nodes \
            WHERE id = $1 AND owner_id = $2 AND deleted_at IS NOT NULL \
            UNION ALL \
            SELECT n.id, n.deleted_at FROM nodes n INNER JOIN batch b ON n.original_parent_id = b.id \
            WHERE n.owner_id = $2 AND n.deleted_at = b.deleted_at \
         ) \
         UPDATE nodes SET \
            parent_id = CASE WHEN id = $1 THEN $3 ELSE original_parent_id END, \
            original_parent_id = NULL, \
            deleted_at = NULL \
         WHERE id IN (SELECT id FROM batch) \
         RETURNING *",
    )
    .bind(id)
    .bind(owner_id)
    .bind(destination)
    .fetch_all(conn)
    .await
    .map_err(|e| match errors::violation(&e) {
        Some(Violation::Unique(Some(NODE_SIBLING_NAME_KEY))) => errors::duplicate_name(&name),
        _ => errors::database("Failed to restore node", e),
    })?;

    Ok(restored.into_iter().find(|n| n.id == id))
}

pub async fn list_trash(
    conn: &mut PgConnection,
    owner_id: i64,
    page: &PageRequest,
) -> AppResult<Vec<Node>> {
    sqlx::query_as::<_, Node>(
        "SELECT n.* FROM nodes n \
         WHERE n.owner_id = $1 AND n.deleted_at IS NOT NULL \
         AND NOT EXISTS ( \
            SELECT 1 FROM nodes p \
            WHERE p.id = n.original_parent_id AND p.deleted_at = n.deleted_at \
         ) \
         ORDER BY n.deleted_at DESC, n.name ASC, n.id ASC \
         LIMIT $2 OFFSET $3",
    )
    .bind(owner_id)
    .bind(page.limit() as i64)
    .bind(page.offset() as i64)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to list trash", e))
}

pub async fn purge_trash(conn: &mut PgConnection, owner_id: i64) -> AppResult<PurgeOutcome> {
    let rows: Vec<(String, NodeType, Option<i64>)> = sqlx::query_as(
        "DELETE FROM nodes WHERE owner_id = $1 AND deleted_at IS NOT NULL \
         RETURNING id, node_type, size_bytes",
    )
    .bind(owner_id)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to purge trash", e))?;

    let mut outcome = PurgeOutcome {
        purged_count: rows.len() as u64,
        ..PurgeOutcome::default()
    };
    for (id, node_type, size) in rows {
        if node_type == NodeType::File {
            outcome.bytes_freed += size.unwrap_or(0);
            outcome.file_ids.push(id);
        }
    }
    Ok(outcome)
}

pub async fn ancestor_chain(
    conn: &mut PgConnection,
    node_id: &str,
    principal_id: i64,
) -> AppResult<Vec<AncestorLink>> {
    sqlx::query_as::<_, AncestorLink>(
        "WITH RECURSIVE chain AS ( \
            SELECT id, owner_id, parent_id, 0 AS depth FROM nodes \
            WHERE id = $1 AND deleted_at IS NULL \
            UNION ALL \
            SELECT n.id, n.owner_id, n.parent_id, c.depth + 1 \
            FROM nodes n INNER JOIN chain c ON n.id = c.parent_id \
            WHERE c.depth < $3 \
         ) \
         SELECT c.id AS node_id, c.owner_id, c.depth, s.permissions AS permission \
         FROM chain c \
         LEFT JOIN shares s ON s.node_id = c.id AND s.recipient_id = $2 \
         ORDER BY c.depth ASC",
    )
    .bind(node_id)
    .bind(principal_id)
    .bind(MAX_TREE_DEPTH)
    .fetch_all(conn)
    .await
    .map_err(|e| errors::database("Failed to walk ancestors", e))
}
