//! Persisted offline Shopify sessions.
//!
//! The OAuth callback stores one offline access token per shop. Identity
//! resolution falls back to this row whenever live request authentication is
//! unavailable.

use chrono::{DateTime, Utc};
use gallery_flow_core::ShopDomain;
use secrecy::SecretString;
use sqlx::PgPool;

use super::RepositoryError;

/// A stored shop credential.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopSession {
    pub shop: ShopDomain,
    pub access_token: SecretString,
    pub scopes: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    shop: String,
    access_token: String,
    scope: String,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for ShopSession {
    fn from(row: SessionRow) -> Self {
        let scopes = row
            .scope
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            shop: ShopDomain::from_trusted(row.shop),
            access_token: SecretString::from(row.access_token),
            scopes,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for `gallery.session`.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the stored session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<ShopSession>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r"
            SELECT shop, access_token, scope, updated_at
            FROM gallery.session
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ShopSession::from))
    }

    /// Save or replace the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(
        &self,
        shop: &ShopDomain,
        access_token: &str,
        scope: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO gallery.session (shop, access_token, scope)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                updated_at = NOW()
            ",
        )
        .bind(shop)
        .bind(access_token)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete the session for a shop. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM gallery.session WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
