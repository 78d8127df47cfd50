//! Database operations for the gallery `PostgreSQL` schema.
//!
//! # Tables (schema `gallery`)
//!
//! - `setting` - Per-shop configuration (mode and gating flags)
//! - `session` - Offline Shopify access tokens per shop
//! - `event` - Merchant-defined, dated gallery targets
//! - `gallery_upload` - Customer submissions, linked to an event or a catalog item
//! - `image` - Uploaded files belonging to a submission
//!
//! Every query is scoped by shop. Deleting an event removes its uploads, and
//! deleting an upload removes its images (`ON DELETE CASCADE`).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/app/migrations/` and run via:
//! ```bash
//! cargo run -p gallery-flow-cli -- migrate
//! ```

pub mod events;
pub mod images;
pub mod sessions;
pub mod settings;
pub mod uploads;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use events::{EventInput, EventRepository};
pub use images::ImageRepository;
pub use sessions::{SessionRepository, ShopSession};
pub use settings::{SettingFlag, SettingRepository};
pub use uploads::{NewImage, NewUpload, UploadLinkage, UploadRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., an upload with both linkages).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique/check violations to `Conflict`, everything else to `Database`.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation()
                    || db_err.is_check_violation()
                    || db_err.is_foreign_key_violation() =>
            {
                Self::Conflict(db_err.message().to_string())
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
