//! Typed errors shared by both store implementations.
//!
//! PostgreSQL reports constraint violations by SQLSTATE and constraint
//! name; the in-memory store raises the same [`AppError`]s directly so the
//! layers above cannot tell the two apart.

use vault_core::error::{AppError, ErrorKind};

/// SQLSTATE `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// SQLSTATE `check_violation`.
const CHECK_VIOLATION: &str = "23514";

pub(crate) const NODE_SIBLING_NAME_KEY: &str = "nodes_live_sibling_name_key";
pub(crate) const NODE_PKEY: &str = "nodes_pkey";
pub(crate) const SHARE_NODE_RECIPIENT_KEY: &str = "shares_node_recipient_key";
pub(crate) const SHARE_NO_SELF_SHARE: &str = "shares_no_self_share";
pub(crate) const FAVORITE_PKEY: &str = "user_favorites_pkey";
pub(crate) const USERNAME_KEY: &str = "users_username_key";

/// A constraint violation reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation<'a> {
    Unique(Option<&'a str>),
    ForeignKey(Option<&'a str>),
    Check(Option<&'a str>),
}

/// Classify a sqlx error as a constraint violation, if it is one.
pub(crate) fn violation(err: &sqlx::Error) -> Option<Violation<'_>> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    let constraint = db_err.constraint();
    match db_err.code().as_deref() {
        Some(UNIQUE_VIOLATION) => Some(Violation::Unique(constraint)),
        Some(FOREIGN_KEY_VIOLATION) => Some(Violation::ForeignKey(constraint)),
        Some(CHECK_VIOLATION) => Some(Violation::Check(constraint)),
        _ => None,
    }
}

/// Wrap a sqlx error that has no domain meaning.
pub(crate) fn database(context: &'static str, err: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::Database, context, err)
}

pub fn duplicate_name(name: &str) -> AppError {
    AppError::conflict(format!(
        "A node named '{name}' already exists in this location"
    ))
}

pub fn node_id_taken(id: &str) -> AppError {
    AppError::conflict(format!("Node id '{id}' is already in use"))
}

pub fn parent_not_found() -> AppError {
    AppError::not_found("Parent folder not found")
}

pub fn node_not_found() -> AppError {
    AppError::not_found("Node not found")
}

pub fn duplicate_share() -> AppError {
    AppError::conflict("This node is already shared with this user")
}

pub fn self_share() -> AppError {
    AppError::invalid_operation("Cannot share a node with yourself")
}

pub fn share_target_missing() -> AppError {
    AppError::not_found("Shared node or recipient not found")
}

pub fn already_favorited() -> AppError {
    AppError::conflict("Node is already in favorites")
}

pub fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

pub fn duplicate_username(username: &str) -> AppError {
    AppError::conflict(format!("Username '{username}' is already taken"))
}

pub fn duplicate_refresh_token() -> AppError {
    AppError::conflict("Refresh token collision")
}
