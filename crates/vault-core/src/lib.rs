//! # vault-core
//!
//! Core crate for Vault. Contains the unified error system, configuration
//! schemas, node identifier generation, pagination, the event envelope,
//! and the traits for the collaborators the engine consumes (blob store,
//! push publisher, principal verifier).
//!
//! This crate has **no** internal dependencies on other Vault crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
