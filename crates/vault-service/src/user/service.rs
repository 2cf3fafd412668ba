//! User creation and lookup.

use std::sync::Arc;

use tracing::info;

use vault_core::config::StorageConfig;
use vault_core::error::AppError;
use vault_core::result::AppResult;
use vault_database::Store;
use vault_database::store::UserQueries;
use vault_entity::user::{CreateUser, User};

/// Creates users with the default quota and looks them up.
///
/// Registration and credentials live outside the engine; this is the
/// bootstrap path used by operators and tests.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    default_quota_bytes: i64,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("default_quota_bytes", &self.default_quota_bytes)
            .finish()
    }
}

impl UserService {
    /// Creates a new user service.
    pub fn new(store: Arc<dyn Store>, storage: &StorageConfig) -> Self {
        Self {
            store,
            default_quota_bytes: storage.default_quota_bytes,
        }
    }

    /// Create a user with the default quota. A taken username is a
    /// `Conflict`.
    pub async fn create_user(
        &self,
        username: &str,
        display_name: Option<&str>,
    ) -> AppResult<User> {
        self.create_user_with_quota(username, display_name, self.default_quota_bytes)
            .await
    }

    /// Create a user with an explicit quota.
    pub async fn create_user_with_quota(
        &self,
        username: &str,
        display_name: Option<&str>,
        quota_bytes: i64,
    ) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() || username.chars().any(char::is_whitespace) {
            return Err(AppError::validation(
                "Username must be non-empty and contain no whitespace",
            ));
        }
        if quota_bytes < 0 {
            return Err(AppError::validation("Quota cannot be negative"));
        }

        let mut tx = self.store.begin().await?;
        let user = tx
            .insert_user(&CreateUser {
                username: username.to_string(),
                display_name: display_name.map(str::to_string),
                storage_quota_bytes: quota_bytes,
            })
            .await?;
        tx.commit().await?;

        info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Look up a user by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<User> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        tx.rollback().await?;
        Ok(user)
    }
}
