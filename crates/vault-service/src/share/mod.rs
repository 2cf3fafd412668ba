//! Share grants between users.

pub mod service;

pub use service::ShareService;
