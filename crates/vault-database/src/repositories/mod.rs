//! PostgreSQL queries, one module per table.
//!
//! Every function takes the connection of an open transaction so the
//! caller decides the atomic scope.

pub mod favorite;
pub mod journal;
pub mod node;
pub mod session;
pub mod share;
pub mod user;
