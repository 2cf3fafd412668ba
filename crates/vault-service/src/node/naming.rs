//! Node name rules and id allocation.

use vault_core::error::AppError;
use vault_core::result::AppResult;
use vault_core::types::generate_node_id;
use vault_database::StoreTransaction;
use vault_database::store::NodeQueries;

/// Attempts made to find an unused node id.
pub const ID_ATTEMPTS: usize = 10;

/// Trim a node name and reject empty names and names containing `/`.
pub fn validate_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if trimmed.contains('/') {
        return Err(AppError::validation("Name cannot contain '/'"));
    }
    Ok(trimmed.to_string())
}

/// Draw random ids until one is unused, giving up after [`ID_ATTEMPTS`].
pub async fn allocate_node_id(tx: &mut dyn StoreTransaction) -> AppResult<String> {
    for _ in 0..ID_ATTEMPTS {
        let id = generate_node_id();
        if !tx.node_exists(&id).await? {
            return Ok(id);
        }
    }
    Err(AppError::internal(format!(
        "No unused node id after {ID_ATTEMPTS} attempts"
    )))
}
