//! Node (file/folder) entities.

pub mod model;
pub mod node_type;

pub use model::{AncestorLink, NewNode, Node, PurgeOutcome};
pub use node_type::NodeType;
