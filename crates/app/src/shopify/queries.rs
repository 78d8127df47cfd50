//! GraphQL operations against the Shopify Admin API.
//!
//! Each operation is a unit struct implementing `graphql_client::GraphQLQuery`
//! with hand-written variables and response types, covering only the fields
//! the gallery reads.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

use super::types::PageInfo;

// =============================================================================
// Shared shapes
// =============================================================================

/// Variables for a cursor-paginated list query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageVariables {
    pub after: Option<String>,
}

/// Variables for a single-node lookup.
#[derive(Debug, Clone, Serialize)]
pub struct IdVariables {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitledNode {
    pub id: String,
    pub title: String,
}

// =============================================================================
// List queries
// =============================================================================

pub struct GetProducts;

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: Connection<TitledNode>,
}

impl GraphQLQuery for GetProducts {
    type Variables = PageVariables;
    type ResponseData = ProductsData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: r"query GetProducts($after: String) {
  products(first: 100, after: $after) {
    edges { node { id title } }
    pageInfo { hasNextPage endCursor }
  }
}",
            operation_name: "GetProducts",
        }
    }
}

pub struct GetCollections;

#[derive(Debug, Deserialize)]
pub struct CollectionsData {
    pub collections: Connection<TitledNode>,
}

impl GraphQLQuery for GetCollections {
    type Variables = PageVariables;
    type ResponseData = CollectionsData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: r"query GetCollections($after: String) {
  collections(first: 100, after: $after) {
    edges { node { id title } }
    pageInfo { hasNextPage endCursor }
  }
}",
            operation_name: "GetCollections",
        }
    }
}

pub struct GetPages;

#[derive(Debug, Deserialize)]
pub struct PagesData {
    pub pages: Connection<TitledNode>,
}

impl GraphQLQuery for GetPages {
    type Variables = PageVariables;
    type ResponseData = PagesData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: r"query GetPages($after: String) {
  pages(first: 100, after: $after) {
    edges { node { id title } }
    pageInfo { hasNextPage endCursor }
  }
}",
            operation_name: "GetPages",
        }
    }
}

pub struct GetBlogs;

#[derive(Debug, Deserialize)]
pub struct BlogNode {
    pub id: String,
    pub title: String,
    pub articles: Connection<TitledNode>,
}

#[derive(Debug, Deserialize)]
pub struct BlogsData {
    pub blogs: Connection<BlogNode>,
}

impl GraphQLQuery for GetBlogs {
    type Variables = PageVariables;
    type ResponseData = BlogsData;

    // Articles are not paginated: a blog contributes its first 100.
    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: r"query GetBlogs($after: String) {
  blogs(first: 50, after: $after) {
    edges {
      node {
        id
        title
        articles(first: 100) { edges { node { id title } } }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}",
            operation_name: "GetBlogs",
        }
    }
}

// =============================================================================
// Single lookups
// =============================================================================

pub struct GetProduct;

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product: Option<TitledNode>,
}

impl GraphQLQuery for GetProduct {
    type Variables = IdVariables;
    type ResponseData = ProductData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: "query GetProduct($id: ID!) { product(id: $id) { id title } }",
            operation_name: "GetProduct",
        }
    }
}

pub struct GetCollection;

#[derive(Debug, Deserialize)]
pub struct CollectionData {
    pub collection: Option<TitledNode>,
}

impl GraphQLQuery for GetCollection {
    type Variables = IdVariables;
    type ResponseData = CollectionData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: "query GetCollection($id: ID!) { collection(id: $id) { id title } }",
            operation_name: "GetCollection",
        }
    }
}

pub struct GetPage;

#[derive(Debug, Deserialize)]
pub struct PageData {
    pub page: Option<TitledNode>,
}

impl GraphQLQuery for GetPage {
    type Variables = IdVariables;
    type ResponseData = PageData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: "query GetPage($id: ID!) { page(id: $id) { id title } }",
            operation_name: "GetPage",
        }
    }
}

// =============================================================================
// Customer purchases
// =============================================================================

pub struct GetCustomerOrderProducts;

#[derive(Debug, Clone, Serialize)]
pub struct CustomerOrdersVariables {
    pub id: String,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct LineItemNode {
    pub product: Option<ProductRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNode {
    pub line_items: Connection<LineItemNode>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerNode {
    pub orders: Connection<OrderNode>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerOrdersData {
    pub customer: Option<CustomerNode>,
}

impl GraphQLQuery for GetCustomerOrderProducts {
    type Variables = CustomerOrdersVariables;
    type ResponseData = CustomerOrdersData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: r"query GetCustomerOrderProducts($id: ID!, $after: String) {
  customer(id: $id) {
    orders(first: 50, after: $after) {
      edges {
        node {
          lineItems(first: 100) { edges { node { product { id } } } }
        }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}",
            operation_name: "GetCustomerOrderProducts",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_serializes_variables() {
        let body = GetProducts::build_query(PageVariables {
            after: Some("cursor-1".to_string()),
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["operationName"], "GetProducts");
        assert_eq!(json["variables"]["after"], "cursor-1");
        assert!(json["query"].as_str().unwrap().contains("products(first: 100"));
    }

    #[test]
    fn test_blogs_response_parses_nested_articles() {
        let data: BlogsData = serde_json::from_value(serde_json::json!({
            "blogs": {
                "edges": [{
                    "node": {
                        "id": "gid://shopify/Blog/1",
                        "title": "News",
                        "articles": {
                            "edges": [{ "node": { "id": "gid://shopify/Article/7", "title": "Launch" } }]
                        }
                    }
                }],
                "pageInfo": { "hasNextPage": false, "endCursor": null }
            }
        }))
        .unwrap();

        let blogs = data.blogs.into_nodes();
        assert_eq!(blogs.len(), 1);
        assert_eq!(blogs[0].articles.edges[0].node.title, "Launch");
    }

    #[test]
    fn test_missing_customer_parses_as_none() {
        let data: CustomerOrdersData =
            serde_json::from_value(serde_json::json!({ "customer": null })).unwrap();
        assert!(data.customer.is_none());
    }
}
