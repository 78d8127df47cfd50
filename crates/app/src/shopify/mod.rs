//! Shopify Admin API access: the catalog client and the OAuth helpers.
//!
//! # Architecture
//!
//! - Offline access tokens are per shop and come from [`crate::services::identity`]
//! - Queries implement `graphql_client::GraphQLQuery` and go through one `execute`
//! - List queries are paginated with a sequential cursor loop
//! - Intake talks to the catalog through the [`CatalogLookup`] trait so tests
//!   can substitute an in-memory catalog
//!
//! # Example
//!
//! ```rust,ignore
//! use gallery_flow_app::shopify::CatalogClient;
//!
//! let client = CatalogClient::new("2024-04");
//! let catalog = client.fetch_catalog(&shop, &access_token).await?;
//! println!("{} products", catalog.products.len());
//! ```

mod client;
pub mod oauth;
pub mod queries;
pub mod types;

use async_trait::async_trait;
use gallery_flow_core::ContentType;
use thiserror::Error;

pub use client::{CatalogClient, ShopCatalog, to_gid};
pub use types::{Blog, Catalog, CatalogItem};

/// Errors that can occur when talking to the Shopify Admin API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Token rejected or OAuth exchange refused.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// A GraphQL error returned by the Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    pub message: String,
    /// Path to the failing field in the response.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Catalog lookups needed while accepting an upload or creating an event.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Title of a catalog item, or `None` if the shop has no such item.
    async fn item_title(&self, kind: ContentType, id: &str)
    -> Result<Option<String>, CatalogError>;

    /// Whether the customer has any order containing the product.
    async fn customer_purchased_product(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> Result<bool, CatalogError>;
}
