//! Event journal configuration.

use serde::{Deserialize, Serialize};

/// Event journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Number of events returned by a single `read_since` call.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Largest serialized payload accepted by `append`.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Events older than this many days are pruned. `None` keeps everything.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_payload_bytes: default_max_payload_bytes(),
            retention_days: None,
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_max_payload_bytes() -> usize {
    65_536
}
