//! Share (permission grant) entities.

pub mod model;
pub mod permission;

pub use model::{CreateShare, OutgoingShare, Share, SharingUser};
pub use permission::Permission;
