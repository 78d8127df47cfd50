//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::shopify::CatalogClient;
use crate::storage::{CloudinaryStorage, ImageStorage};

/// Application state shared across all handlers.
///
/// Cheap to clone: everything lives behind one `Arc`. Holds no per-request
/// or per-shop data.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    catalog: CatalogClient,
    storage: Arc<dyn ImageStorage>,
}

impl AppState {
    /// Build the production state: Shopify catalog client and Cloudinary
    /// storage sharing one HTTP client.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let catalog = CatalogClient::new(config.shopify.api_version.clone());
        let storage = CloudinaryStorage::new(catalog.http().clone(), &config.cloudinary);
        Self::from_parts(config, pool, catalog, Arc::new(storage))
    }

    /// Build state from explicit parts, e.g. an in-memory storage in tests.
    #[must_use]
    pub fn from_parts(
        config: AppConfig,
        pool: PgPool,
        catalog: CatalogClient,
        storage: Arc<dyn ImageStorage>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                storage,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    #[must_use]
    pub fn storage(&self) -> &dyn ImageStorage {
        self.inner.storage.as_ref()
    }

    /// Suffix every shop domain and storefront origin must end with.
    #[must_use]
    pub fn store_suffix(&self) -> &str {
        &self.inner.config.shopify.store_domain_suffix
    }
}
