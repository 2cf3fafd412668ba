//! Embedded schema migrations.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use vault_core::error::{AppError, ErrorKind};
use vault_core::result::AppResult;

/// Every migration under `migrations/`, compiled into the binary.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the schema up to the newest embedded version.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let latest = MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0);
    info!(embedded = MIGRATOR.iter().count(), latest, "Applying schema migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Schema migration failed", e)
    })?;

    info!(version = latest, "Schema is current");
    Ok(())
}
