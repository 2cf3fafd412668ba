//! Blob storage and quota configuration.

use serde::{Deserialize, Serialize};

/// Blob storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local blob store.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Quota assigned to newly created users, in bytes.
    #[serde(default = "default_quota")]
    pub default_quota_bytes: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            default_quota_bytes: default_quota(),
        }
    }
}

fn default_root_path() -> String {
    "./data/blobs".to_string()
}

fn default_quota() -> i64 {
    10_737_418_240 // 10 GB
}
