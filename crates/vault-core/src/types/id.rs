//! Node identifiers and opaque tokens.
//!
//! Node ids are fixed-length random strings over a URL-safe alphabet.
//! They carry no meaning and are not derived from content; uniqueness is
//! checked against the store at creation time.

use crate::error::AppError;

/// Length of every node identifier.
pub const NODE_ID_LEN: usize = 21;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Produce `len` characters sampled from the URL-safe alphabet.
fn random_string(len: usize) -> String {
    // 64 symbols: the low six bits of a byte index without bias.
    (0..len)
        .map(|_| ALPHABET[(rand::random::<u8>() & 63) as usize] as char)
        .collect()
}

/// Generate a new candidate node id. Callers must check it is unused.
pub fn generate_node_id() -> String {
    random_string(NODE_ID_LEN)
}

/// Generate an opaque bearer token (refresh tokens).
pub fn generate_token() -> String {
    random_string(NODE_ID_LEN * 2)
}

/// Reject identifiers that cannot possibly be node ids.
pub fn validate_node_id(id: &str) -> Result<(), AppError> {
    if id.len() != NODE_ID_LEN || !id.bytes().all(|b| ALPHABET.contains(&b)) {
        return Err(AppError::invalid_operation(format!(
            "Invalid node id format: '{id}'"
        )));
    }
    Ok(())
}
