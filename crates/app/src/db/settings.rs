//! Per-shop settings.

use gallery_flow_core::ShopDomain;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::Setting;

/// A boolean column on `gallery.setting` that merchants can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingFlag {
    AddEventEnabled,
    OnlyPurchasedItem,
    FetchVariantEnabled,
    UploadsEnabled,
}

impl SettingFlag {
    const fn column(self) -> &'static str {
        match self {
            Self::AddEventEnabled => "add_event_enabled",
            Self::OnlyPurchasedItem => "only_purchased_item",
            Self::FetchVariantEnabled => "fetch_variant_enabled",
            Self::UploadsEnabled => "uploads_enabled",
        }
    }
}

const SETTING_COLUMNS: &str = "shop, add_event_enabled, only_purchased_item, \
     fetch_variant_enabled, uploads_enabled, created_at, updated_at";

/// Repository for `gallery.setting`.
pub struct SettingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the setting row for a shop, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, shop: &ShopDomain) -> Result<Option<Setting>, RepositoryError> {
        let setting = sqlx::query_as::<_, Setting>(&format!(
            "SELECT {SETTING_COLUMNS} FROM gallery.setting WHERE shop = $1"
        ))
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        Ok(setting)
    }

    /// Get the setting row for a shop, creating it with defaults on first access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, shop: &ShopDomain) -> Result<Setting, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let setting = sqlx::query_as::<_, Setting>(&format!(
            "INSERT INTO gallery.setting (shop) VALUES ($1)
             ON CONFLICT (shop) DO UPDATE SET shop = EXCLUDED.shop
             RETURNING {SETTING_COLUMNS}"
        ))
        .bind(shop)
        .fetch_one(self.pool)
        .await?;

        Ok(setting)
    }

    /// Set one flag, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_flag(
        &self,
        shop: &ShopDomain,
        flag: SettingFlag,
        enabled: bool,
    ) -> Result<Setting, RepositoryError> {
        let column = flag.column();
        let setting = sqlx::query_as::<_, Setting>(&format!(
            "INSERT INTO gallery.setting (shop, {column}) VALUES ($1, $2)
             ON CONFLICT (shop) DO UPDATE SET {column} = EXCLUDED.{column}, updated_at = NOW()
             RETURNING {SETTING_COLUMNS}"
        ))
        .bind(shop)
        .bind(enabled)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(shop = %shop, flag = column, enabled, "Setting updated");
        Ok(setting)
    }
}
