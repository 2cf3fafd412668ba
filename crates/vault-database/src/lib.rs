//! # vault-database
//!
//! The transactional store behind the Vault engine. [`store::Store`] hands
//! out [`store::StoreTransaction`]s; every query the engine needs is a
//! method on the transaction, so a mutation, its authorization checks, and
//! its journal rows always share one atomic scope.
//!
//! Two implementations are provided: [`PgStore`] on PostgreSQL (the
//! per-table SQL lives in [`repositories`]) and [`MemoryStore`], which
//! reproduces the same constraint behavior in process for tests and
//! single-node experiments.

pub mod connection;
pub mod errors;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
pub use store::{Store, StoreTransaction};
