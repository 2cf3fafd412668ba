//! # vault-storage
//!
//! Blob content storage for Vault. Node content is kept outside the
//! database, keyed by node id.

pub mod mime;
pub mod providers;

pub use mime::mime_from_name;
pub use providers::LocalBlobStore;
