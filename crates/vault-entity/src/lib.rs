//! # vault-entity
//!
//! Row models for Vault. Every struct in this crate represents a database
//! table row, a query projection, or an event payload. Row types derive
//! `sqlx::FromRow` in addition to the serde traits.

pub mod event;
pub mod favorite;
pub mod node;
pub mod session;
pub mod share;
pub mod user;
