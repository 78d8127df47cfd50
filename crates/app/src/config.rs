//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GALLERY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `GALLERY_BASE_URL` - Public URL of the app (OAuth redirect base)
//! - `SHOPIFY_API_KEY` - App client ID (session-token audience)
//! - `SHOPIFY_API_SECRET` - App client secret (HMAC and session-token key)
//! - `CLOUDINARY_CLOUD_NAME` - Image storage cloud name
//! - `CLOUDINARY_API_KEY` - Image storage API key
//! - `CLOUDINARY_API_SECRET` - Image storage API secret
//!
//! ## Optional
//! - `GALLERY_HOST` - Bind address (default: 127.0.0.1)
//! - `GALLERY_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2024-04)
//! - `SHOPIFY_SCOPES` - OAuth scopes (default: `read_products,read_content,read_customers,read_orders`)
//! - `STORE_DOMAIN_SUFFIX` - Allowed shop/origin suffix (default: .myshopify.com)
//! - `CLOUDINARY_FOLDER` - Upload folder (default: shopify-gallery)
//! - `UPLOAD_MAX_FILES` - Files per submission (default: 10)
//! - `UPLOAD_MAX_FILE_BYTES` - Bytes per file (default: 10 MiB)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_API_VERSION: &str = "2024-04";
const DEFAULT_SCOPES: &str = "read_products,read_content,read_customers,read_orders";
const DEFAULT_MAX_FILES: usize = 10;
const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Gallery app configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, used to build the OAuth redirect URI
    pub base_url: String,
    pub shopify: ShopifyAppConfig,
    pub cloudinary: CloudinaryConfig,
    pub uploads: UploadLimits,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Shopify app credentials and API settings.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// App client ID; also the `aud` of embedded-admin session tokens
    pub api_key: String,
    /// App client secret; signs OAuth callbacks, app-proxy requests and session tokens
    pub api_secret: SecretString,
    pub api_version: String,
    pub scopes: String,
    /// Suffix every shop domain and storefront origin must carry
    pub store_domain_suffix: String,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("scopes", &self.scopes)
            .field("store_domain_suffix", &self.store_domain_suffix)
            .finish()
    }
}

/// Cloudinary image storage credentials.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
    /// Folder uploaded images are placed in
    pub folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

/// Bounds on a single upload submission. Every file is held in memory until
/// the whole batch has been transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl UploadLimits {
    /// Largest request body an upload may carry, with headroom for form fields.
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_files
            .saturating_mul(self.max_file_bytes)
            .saturating_add(64 * 1024)
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("GALLERY_DATABASE_URL")?;
        let host = get_env_or_default("GALLERY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("GALLERY_HOST".to_string(), e.to_string()))?;
        let port = parse_env("GALLERY_PORT", "3000")?;
        let base_url = get_required_env("GALLERY_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("GALLERY_BASE_URL".to_string(), e.to_string())
        })?;

        let shopify = ShopifyAppConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;
        let uploads = UploadLimits::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            shopify,
            cloudinary,
            uploads,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// OAuth redirect URI registered with Shopify.
    #[must_use]
    pub fn oauth_redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.base_url)
    }
}

impl ShopifyAppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let store_domain_suffix = get_env_or_default("STORE_DOMAIN_SUFFIX", ".myshopify.com");
        if !store_domain_suffix.starts_with('.') {
            return Err(ConfigError::InvalidEnvVar(
                "STORE_DOMAIN_SUFFIX".to_string(),
                "must start with '.'".to_string(),
            ));
        }

        Ok(Self {
            api_key: get_required_env("SHOPIFY_API_KEY")?,
            api_secret: get_validated_secret("SHOPIFY_API_SECRET")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            scopes: get_env_or_default("SHOPIFY_SCOPES", DEFAULT_SCOPES),
            store_domain_suffix,
        })
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_validated_secret("CLOUDINARY_API_SECRET")?,
            folder: get_env_or_default("CLOUDINARY_FOLDER", "shopify-gallery"),
        })
    }
}

impl UploadLimits {
    fn from_env() -> Result<Self, ConfigError> {
        let max_files: usize = parse_env("UPLOAD_MAX_FILES", &DEFAULT_MAX_FILES.to_string())?;
        let max_file_bytes: usize =
            parse_env("UPLOAD_MAX_FILE_BYTES", &DEFAULT_MAX_FILE_BYTES.to_string())?;

        if max_files == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "UPLOAD_MAX_FILES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_files,
            max_file_bytes,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the value from your Partner Dashboard."
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
