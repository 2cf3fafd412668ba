//! Share permission enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capability granted by a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_permission", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// List and download.
    Read,
    /// Read plus create, rename, move, and trash inside the shared subtree.
    Write,
}

impl Permission {
    /// Check if this permission allows write operations.
    pub fn can_write(&self) -> bool {
        matches!(self, Self::Write)
    }

    /// Return the permission as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = vault_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            _ => Err(vault_core::AppError::validation(format!(
                "Invalid permission: '{s}'. Must be 'read' or 'write'"
            ))),
        }
    }
}
