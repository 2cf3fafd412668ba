//! Per-user favorite markers.

pub mod service;

pub use service::FavoriteService;
