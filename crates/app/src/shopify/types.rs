//! Catalog types returned to callers of the client.

use serde::{Deserialize, Serialize};

/// A product, collection, page or article: just what the gallery needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Shopify global id (`gid://shopify/Product/123`).
    pub id: String,
    pub title: String,
}

/// A blog with its first page of articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: String,
    pub title: String,
    pub articles: Vec<CatalogItem>,
}

/// Everything a storefront can attach an item-mode upload to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<CatalogItem>,
    pub blogs: Vec<Blog>,
    pub collections: Vec<CatalogItem>,
    pub pages: Vec<CatalogItem>,
}

/// Cursor information for a connection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}
