//! Refresh-token sessions and handshake verification.

pub mod service;
pub mod verifier;

pub use service::SessionService;
pub use verifier::SessionVerifier;
