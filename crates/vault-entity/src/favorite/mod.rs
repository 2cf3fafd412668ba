//! Favorite marker entity.

pub mod model;

pub use model::Favorite;
