//! Ownership and share-derived access decisions.

pub mod resolver;

pub use resolver::{AccessSource, NodeAccess};
