//! Connection bookkeeping.

pub mod handle;

pub use handle::{ConnectionHandle, ConnectionId, Registration};
