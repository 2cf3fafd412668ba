//! Journal rows and event payloads.

pub mod model;
pub mod payload;

pub use model::JournalEvent;
pub use payload::{
    NodeMovedPayload, NodeRefPayload, NodeRenamedPayload, NodeSharedPayload, NodeTrashedPayload,
    TrashPurgedPayload,
};
