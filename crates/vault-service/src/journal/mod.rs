//! Event journal: payload limits and per-user reads.

pub mod service;

pub use service::{Journal, JournalService};
