//! Notification hub configuration.

use serde::{Deserialize, Serialize};

/// Notification hub (WebSocket push) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum live connections per user. `0` means unlimited.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Capacity of each connection's outbound queue.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
        }
    }
}

fn default_max_connections_per_user() -> usize {
    16
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}
