//! Session configuration.

use serde::{Deserialize, Serialize};

/// Refresh-token session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a session (and its refresh token) in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// Whether revoking all sessions also closes the user's live push
    /// connections.
    #[serde(default = "default_true")]
    pub disconnect_on_revoke_all: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            disconnect_on_revoke_all: true,
        }
    }
}

fn default_ttl_hours() -> u64 {
    24 * 7
}

fn default_true() -> bool {
    true
}
