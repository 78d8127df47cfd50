//! CLI subcommands.

pub mod cleanup;
pub mod migrate;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

const DATABASE_URL_VAR: &str = "GALLERY_DATABASE_URL";

/// Errors shared by every subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] gallery_flow_app::db::RepositoryError),
}

/// Connect to the gallery database named by `GALLERY_DATABASE_URL`.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url: SecretString = std::env::var(DATABASE_URL_VAR)
        .map_err(|_| CommandError::MissingEnvVar(DATABASE_URL_VAR))?
        .into();

    tracing::info!("Connecting to gallery database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}
