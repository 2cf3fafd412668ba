//! Authenticated principal and the verifier that produces it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// The authenticated actor of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id.
    pub user_id: i64,
    /// Username.
    pub username: String,
}

impl Principal {
    /// Create a principal.
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Turns an opaque handshake token into a [`Principal`].
///
/// Token issuance lives outside this workspace; implementations wrap
/// whatever scheme the deployment uses.
#[async_trait]
pub trait PrincipalVerifier: Send + Sync + 'static {
    /// Verify `token`, failing with an authentication error when it is
    /// invalid or expired.
    async fn verify(&self, token: &str) -> AppResult<Principal>;
}
