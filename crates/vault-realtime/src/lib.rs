//! # vault-realtime
//!
//! Live push for Vault:
//!
//! - [`Hub`]: per-user registry of live connections with bounded,
//!   non-blocking fan-out
//! - [`server`]: WebSocket endpoint that authenticates the handshake,
//!   registers the connection, and drains its outbound queue

pub mod connection;
pub mod hub;
pub mod server;

pub use connection::{ConnectionHandle, ConnectionId, Registration};
pub use hub::Hub;
pub use server::{WsState, ws_router};
