//! Collaborator traits defined in `vault-core` and implemented by other
//! crates.

pub mod blob;
pub mod principal;
pub mod publisher;

pub use blob::{BlobStore, ByteStream};
pub use principal::{Principal, PrincipalVerifier};
pub use publisher::{NoopPublisher, Publisher};
