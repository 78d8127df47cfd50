//! Integration test fixtures for Gallery Flow.
//!
//! # Running Tests
//!
//! ```bash
//! # Router tests, no database needed
//! cargo test -p gallery-flow-integration-tests
//!
//! # Database scenarios (each test gets a fresh migrated database)
//! DATABASE_URL=postgres://localhost/gallery_test \
//!     cargo test -p gallery-flow-integration-tests -- --ignored
//! ```
//!
//! Storage and catalog are replaced with in-memory doubles so no Cloudinary
//! or Shopify credentials are needed.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gallery_flow_app::config::{AppConfig, CloudinaryConfig, ShopifyAppConfig, UploadLimits};
use gallery_flow_app::shopify::{CatalogClient, CatalogError, CatalogLookup};
use gallery_flow_app::state::AppState;
use gallery_flow_app::storage::{ImageStorage, StorageError, StoredImage, UploadFile};
use gallery_flow_core::{ContentType, DEFAULT_STORE_SUFFIX, ShopDomain};
use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub const API_KEY: &str = "test-api-key";
pub const API_SECRET: &str = "k3J9x2Qv8LmN4pRt7WzY1aBcD5eFgH6i";
pub const SHOP: &str = "demo.myshopify.com";
pub const OTHER_SHOP: &str = "other.myshopify.com";

/// Configuration with fixed secrets and small upload limits.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://localhost/gallery_test"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "https://gallery.example.com".to_string(),
        shopify: ShopifyAppConfig {
            api_key: API_KEY.to_string(),
            api_secret: SecretString::from(API_SECRET),
            api_version: "2025-01".to_string(),
            scopes: "read_products,read_content,read_orders".to_string(),
            store_domain_suffix: DEFAULT_STORE_SUFFIX.to_string(),
        },
        cloudinary: CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "cloud-key".to_string(),
            api_secret: SecretString::from("cloud-secret"),
            folder: "gallery".to_string(),
        },
        uploads: UploadLimits {
            max_files: 3,
            max_file_bytes: 1024,
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// State over the given pool with in-memory storage.
#[must_use]
pub fn state_with_pool(pool: PgPool, storage: Arc<MemoryStorage>) -> AppState {
    let config = test_config();
    let catalog = CatalogClient::new(config.shopify.api_version.clone());
    AppState::from_parts(config, pool, catalog, storage)
}

/// State whose pool never connects unless a handler reaches the database.
#[must_use]
pub fn offline_state() -> AppState {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/gallery_unreachable")
        .unwrap();
    state_with_pool(pool, Arc::new(MemoryStorage::default()))
}

#[must_use]
pub fn shop() -> ShopDomain {
    ShopDomain::parse(SHOP).unwrap()
}

#[must_use]
pub fn other_shop() -> ShopDomain {
    ShopDomain::parse(OTHER_SHOP).unwrap()
}

#[must_use]
pub fn image_file(name: &str) -> UploadFile {
    UploadFile {
        file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

/// Storage that records transfers and can fail on the n-th upload (0-based).
#[derive(Default)]
pub struct MemoryStorage {
    pub fail_on: Option<usize>,
    pub uploaded: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStorage for MemoryStorage {
    async fn upload(&self, file: &UploadFile) -> Result<StoredImage, StorageError> {
        let mut uploaded = self.uploaded.lock().unwrap();
        if self.fail_on == Some(uploaded.len()) {
            return Err(StorageError::Rejected("quota exceeded".to_string()));
        }
        let public_id = format!("gallery/{}", file.file_name);
        uploaded.push(public_id.clone());
        Ok(StoredImage {
            url: format!("https://res.cloudinary.com/demo/{public_id}"),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

/// Catalog with fixed titles and `(customer, product)` purchases.
#[derive(Default)]
pub struct MemoryCatalog {
    pub titles: HashMap<String, String>,
    pub purchases: Vec<(String, String)>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn with_title(mut self, id: &str, title: &str) -> Self {
        self.titles.insert(id.to_string(), title.to_string());
        self
    }
}

#[async_trait]
impl CatalogLookup for MemoryCatalog {
    async fn item_title(
        &self,
        _kind: ContentType,
        id: &str,
    ) -> Result<Option<String>, CatalogError> {
        Ok(self.titles.get(id).cloned())
    }

    async fn customer_purchased_product(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> Result<bool, CatalogError> {
        Ok(self
            .purchases
            .iter()
            .any(|(c, p)| c == customer_id && p == product_id))
    }
}

/// A hand-built `multipart/form-data` body: `(content type, body)`.
#[must_use]
pub fn multipart_body(fields: &[(&str, &str)], files: &[UploadFile]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "gallery-flow-test-boundary";
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.file_name,
                file.content_type.as_deref().unwrap_or("application/octet-stream"),
            )
            .as_bytes(),
        );
        body.extend_from_slice(&file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// An embedded-admin session token for `shop`, signed with the test secret.
#[must_use]
pub fn session_token(shop: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = serde_json::json!({
        "iss": format!("https://{shop}/admin"),
        "dest": format!("https://{shop}"),
        "aud": API_KEY,
        "sub": "1",
        "exp": now + 60,
        "nbf": now - 5,
        "iat": now,
    });
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(API_SECRET.as_bytes()),
    )
    .unwrap()
}
