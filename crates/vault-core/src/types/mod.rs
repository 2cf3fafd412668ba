//! Core type definitions used across the Vault workspace.

pub mod id;
pub mod pagination;

pub use id::{NODE_ID_LEN, generate_node_id, generate_token, validate_node_id};
pub use pagination::PageRequest;
