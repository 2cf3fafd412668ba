//! Handshake verification backed by the session table.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use vault_core::error::AppError;
use vault_core::result::AppResult;
use vault_core::traits::{Principal, PrincipalVerifier};
use vault_database::Store;
use vault_database::store::{SessionQueries, UserQueries};

/// Accepts a live refresh token as the push handshake credential.
#[derive(Clone)]
pub struct SessionVerifier {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier").finish()
    }
}

impl SessionVerifier {
    /// Creates a verifier over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PrincipalVerifier for SessionVerifier {
    async fn verify(&self, token: &str) -> AppResult<Principal> {
        if token.is_empty() {
            return Err(AppError::authentication("Missing token"));
        }

        let mut tx = self.store.begin().await?;
        let session = tx
            .find_session_by_token(token)
            .await?
            .filter(|s| !s.is_expired_at(Utc::now()))
            .ok_or_else(|| AppError::authentication("Invalid or expired token"))?;
        let user = tx
            .find_user(session.user_id)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid or expired token"))?;
        tx.rollback().await?;

        debug!(user_id = user.id, session_id = %session.id, "Handshake token verified");
        Ok(Principal::new(user.id, user.username))
    }
}
