//! User bootstrap and lookup.

pub mod service;

pub use service::UserService;
