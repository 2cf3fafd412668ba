//! Login session entities.

pub mod model;

pub use model::{CreateSession, Session};
