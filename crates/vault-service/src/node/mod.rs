//! Node tree operations: create, rename, move, list, trash, restore, purge.

pub mod naming;
pub mod service;
pub mod trash;

pub use service::NodeService;
pub use trash::TrashService;
