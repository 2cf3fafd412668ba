//! Session creation, rotation, listing, and revocation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use vault_core::config::SessionConfig;
use vault_core::error::AppError;
use vault_core::result::AppResult;
use vault_core::traits::Publisher;
use vault_core::types::generate_token;
use vault_database::Store;
use vault_database::store::SessionQueries;
use vault_entity::session::{CreateSession, Session};

use crate::context::RequestContext;

/// Manages refresh-token sessions.
///
/// Sessions are only ever inserted and deleted. Rotation replaces the row
/// so a refresh token is usable exactly once.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn Store>,
    publisher: Arc<dyn Publisher>,
    config: SessionConfig,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("config", &self.config)
            .finish()
    }
}

impl SessionService {
    /// Creates a new session service.
    pub fn new(
        store: Arc<dyn Store>,
        publisher: Arc<dyn Publisher>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    fn new_session(&self, user_id: i64, user_agent: &str, client_ip: &str) -> CreateSession {
        let now = Utc::now();
        let expires_at = i64::try_from(self.config.ttl_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        CreateSession {
            id: Uuid::new_v4(),
            user_id,
            refresh_token: generate_token(),
            user_agent: user_agent.to_string(),
            client_ip: client_ip.to_string(),
            expires_at,
        }
    }

    /// Open a session for a user who has just authenticated.
    pub async fn create(
        &self,
        user_id: i64,
        user_agent: &str,
        client_ip: &str,
    ) -> AppResult<Session> {
        let mut tx = self.store.begin().await?;
        let session = tx
            .insert_session(&self.new_session(user_id, user_agent, client_ip))
            .await?;
        tx.commit().await?;

        info!(session_id = %session.id, user_id, "Session created");
        Ok(session)
    }

    /// Exchange a refresh token for a new session.
    ///
    /// The old session is deleted and the new one inserted in the same
    /// transaction. Unknown or expired tokens are `Authentication` errors.
    pub async fn rotate(
        &self,
        refresh_token: &str,
        user_agent: &str,
        client_ip: &str,
    ) -> AppResult<Session> {
        let mut tx = self.store.begin().await?;
        let old = tx
            .find_session_by_token(refresh_token)
            .await?
            .filter(|s| !s.is_expired_at(Utc::now()))
            .ok_or_else(|| AppError::authentication("Invalid or expired refresh token"))?;

        if !tx.delete_session(old.id, old.user_id).await? {
            return Err(AppError::authentication("Invalid or expired refresh token"));
        }
        let session = tx
            .insert_session(&self.new_session(old.user_id, user_agent, client_ip))
            .await?;
        tx.commit().await?;

        info!(
            old_session_id = %old.id,
            session_id = %session.id,
            user_id = session.user_id,
            "Session rotated"
        );
        Ok(session)
    }

    /// The caller's unexpired sessions, newest first.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<Session>> {
        let mut tx = self.store.begin().await?;
        let sessions = tx.list_sessions(ctx.user_id).await?;
        tx.rollback().await?;
        Ok(sessions)
    }

    /// Revoke one of the caller's sessions.
    pub async fn revoke(&self, ctx: &RequestContext, session_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_session(session_id, ctx.user_id).await? {
            return Err(AppError::not_found("Session not found"));
        }
        tx.commit().await?;

        info!(%session_id, user_id = ctx.user_id, "Session revoked");
        Ok(())
    }

    /// Revoke every session of the caller. Live push connections are
    /// closed too when `disconnect_on_revoke_all` is set.
    pub async fn revoke_all(&self, ctx: &RequestContext) -> AppResult<u64> {
        let mut tx = self.store.begin().await?;
        let removed = tx.delete_all_sessions(ctx.user_id).await?;
        tx.commit().await?;

        if self.config.disconnect_on_revoke_all {
            self.publisher.disconnect_user(ctx.user_id);
        }

        info!(user_id = ctx.user_id, removed, "All sessions revoked");
        Ok(removed)
    }
}
