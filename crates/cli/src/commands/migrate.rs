//! Database migrations.
//!
//! Migration files live in `crates/app/migrations/` and are embedded at
//! compile time.

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running gallery migrations...");
    sqlx::migrate!("../app/migrations").run(&pool).await?;

    tracing::info!("Gallery migrations complete!");
    Ok(())
}
