//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use seatkeeper_core::error::{AppError, ErrorKind};

/// Apply pending schema migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Applying seat pool schema migrations");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, format!("Migration failed: {e}"), e)
        })?;

    info!("Seat pool schema is up to date");
    Ok(())
}
