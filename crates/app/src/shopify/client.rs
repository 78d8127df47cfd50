//! Shopify Admin API GraphQL client.

use std::sync::Arc;

use async_trait::async_trait;
use gallery_flow_core::{ContentType, ShopDomain, matches_content_id};
use graphql_client::GraphQLQuery;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;

use super::queries::{
    Connection, CustomerOrdersVariables, GetBlogs, GetCollection, GetCollections,
    GetCustomerOrderProducts, GetPage, GetPages, GetProduct, GetProducts, IdVariables,
    PageVariables, TitledNode,
};
use super::types::{Blog, Catalog, CatalogItem, PageInfo};
use super::{CatalogError, CatalogLookup, GraphQLError};
use crate::config::ShopifyAppConfig;

/// Shopify Admin API client shared by all shops.
///
/// Holds no credentials: every call takes the shop and its access token.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    http: reqwest::Client,
    api_version: String,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

/// Offline token issued by the OAuth code exchange.
#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
}

/// Turn a bare numeric id into a global id of the given kind. Global ids pass through.
#[must_use]
pub fn to_gid(kind: &str, id: &str) -> String {
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("gid://shopify/{kind}/{id}")
    }
}

impl CatalogClient {
    #[must_use]
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(CatalogClientInner {
                http: reqwest::Client::new(),
                api_version: api_version.into(),
            }),
        }
    }

    /// Underlying HTTP client, shared with the image storage backend.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    // =========================================================================
    // OAuth
    // =========================================================================

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Unauthorized` if Shopify refuses the code and
    /// `CatalogError::Http` if the request fails.
    #[instrument(skip(self, config, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        config: &ShopifyAppConfig,
        code: &str,
    ) -> Result<AccessTokenResponse, CatalogError> {
        let url = format!("https://{shop}/admin/oauth/access_token");
        let params = [
            ("client_id", config.api_key.as_str()),
            ("client_secret", config.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.inner.http.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Unauthorized(format!(
                "Token exchange failed: {text}"
            )));
        }

        Ok(response.json().await?)
    }

    // =========================================================================
    // GraphQL execution
    // =========================================================================

    /// Execute one GraphQL operation for a shop.
    async fn execute<Q: GraphQLQuery>(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, CatalogError>
    where
        Q::ResponseData: DeserializeOwned,
    {
        let endpoint = format!(
            "https://{shop}/admin/api/{}/graphql.json",
            self.inner.api_version
        );
        let body = Q::build_query(variables);

        let response = self
            .inner
            .http
            .post(&endpoint)
            .header("X-Shopify-Access-Token", access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(2);
            return Err(CatalogError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CatalogError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let graphql_response: GraphQLResponse<Q::ResponseData> = response.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let errors = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    path: e.path,
                })
                .collect();
            return Err(CatalogError::GraphQL(errors));
        }

        graphql_response.data.ok_or_else(|| {
            CatalogError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                path: vec![],
            }])
        })
    }

    /// Follow a connection's cursor until Shopify reports no further page.
    async fn paginate<Q, T, F>(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        mut extract: F,
    ) -> Result<Vec<T>, CatalogError>
    where
        Q: GraphQLQuery<Variables = PageVariables>,
        Q::ResponseData: DeserializeOwned,
        F: FnMut(Q::ResponseData) -> (Vec<T>, PageInfo),
    {
        let mut items = Vec::new();
        let mut after = None;

        loop {
            let data = self
                .execute::<Q>(shop, access_token, PageVariables { after })
                .await?;
            let (page, page_info) = extract(data);
            items.extend(page);

            match page_info.end_cursor {
                Some(cursor) if page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        Ok(items)
    }

    // =========================================================================
    // Catalog listings
    // =========================================================================

    /// All products of a shop.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self, access_token), fields(shop = %shop))]
    pub async fn fetch_products(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.paginate::<GetProducts, _, _>(shop, access_token, |d| titled_page(d.products))
            .await
    }

    /// All collections of a shop.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self, access_token), fields(shop = %shop))]
    pub async fn fetch_collections(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.paginate::<GetCollections, _, _>(shop, access_token, |d| titled_page(d.collections))
            .await
    }

    /// All online store pages of a shop.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self, access_token), fields(shop = %shop))]
    pub async fn fetch_pages(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        self.paginate::<GetPages, _, _>(shop, access_token, |d| titled_page(d.pages))
            .await
    }

    /// All blogs of a shop, each with its first 100 articles.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self, access_token), fields(shop = %shop))]
    pub async fn fetch_blogs(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Vec<Blog>, CatalogError> {
        self.paginate::<GetBlogs, _, _>(shop, access_token, |d| {
            let page_info = d.blogs.page_info.clone();
            let blogs = d
                .blogs
                .into_nodes()
                .into_iter()
                .map(|b| Blog {
                    id: b.id,
                    title: b.title,
                    articles: b.articles.into_nodes().into_iter().map(into_item).collect(),
                })
                .collect();
            (blogs, page_info)
        })
        .await
    }

    /// Products, blogs, collections and pages fetched concurrently.
    ///
    /// # Errors
    ///
    /// Fails as a whole if any of the four listings fails.
    pub async fn fetch_catalog(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
    ) -> Result<Catalog, CatalogError> {
        let (products, blogs, collections, pages) = tokio::try_join!(
            self.fetch_products(shop, access_token),
            self.fetch_blogs(shop, access_token),
            self.fetch_collections(shop, access_token),
            self.fetch_pages(shop, access_token),
        )?;

        Ok(Catalog {
            products,
            blogs,
            collections,
            pages,
        })
    }

    // =========================================================================
    // Single lookups
    // =========================================================================

    /// Look up one product by id (bare or global).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_product(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        id: &str,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        let vars = IdVariables {
            id: to_gid("Product", id),
        };
        let data = self.execute::<GetProduct>(shop, access_token, vars).await?;
        Ok(data.product.map(into_item))
    }

    /// Look up one collection by id (bare or global).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_collection(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        id: &str,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        let vars = IdVariables {
            id: to_gid("Collection", id),
        };
        let data = self
            .execute::<GetCollection>(shop, access_token, vars)
            .await?;
        Ok(data.collection.map(into_item))
    }

    /// Look up one page by id (bare or global).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_page(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        id: &str,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        let vars = IdVariables {
            id: to_gid("Page", id),
        };
        let data = self.execute::<GetPage>(shop, access_token, vars).await?;
        Ok(data.page.map(into_item))
    }

    /// Whether any of the customer's orders contains the product.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self, access_token), fields(shop = %shop))]
    pub async fn customer_purchased_product(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        customer_id: &str,
        product_id: &str,
    ) -> Result<bool, CatalogError> {
        let id = to_gid("Customer", customer_id);
        let mut after = None;

        loop {
            let vars = CustomerOrdersVariables {
                id: id.clone(),
                after,
            };
            let data = self
                .execute::<GetCustomerOrderProducts>(shop, access_token, vars)
                .await?;
            let Some(customer) = data.customer else {
                return Ok(false);
            };

            let page_info = customer.orders.page_info.clone();
            let found = customer.orders.into_nodes().into_iter().any(|order| {
                order
                    .line_items
                    .into_nodes()
                    .into_iter()
                    .filter_map(|li| li.product)
                    .any(|p| matches_content_id(Some(&p.id), Some(product_id)))
            });
            if found {
                return Ok(true);
            }

            match page_info.end_cursor {
                Some(cursor) if page_info.has_next_page => after = Some(cursor),
                _ => return Ok(false),
            }
        }
    }
}

fn into_item(node: TitledNode) -> CatalogItem {
    CatalogItem {
        id: node.id,
        title: node.title,
    }
}

fn titled_page(connection: Connection<TitledNode>) -> (Vec<CatalogItem>, PageInfo) {
    let page_info = connection.page_info.clone();
    let items = connection.into_nodes().into_iter().map(into_item).collect();
    (items, page_info)
}

/// The catalog of one shop, bound to its credential.
pub struct ShopCatalog<'a> {
    client: &'a CatalogClient,
    shop: &'a ShopDomain,
    access_token: &'a SecretString,
}

impl<'a> ShopCatalog<'a> {
    #[must_use]
    pub const fn new(
        client: &'a CatalogClient,
        shop: &'a ShopDomain,
        access_token: &'a SecretString,
    ) -> Self {
        Self {
            client,
            shop,
            access_token,
        }
    }
}

#[async_trait]
impl CatalogLookup for ShopCatalog<'_> {
    async fn item_title(
        &self,
        kind: ContentType,
        id: &str,
    ) -> Result<Option<String>, CatalogError> {
        let (client, shop, token) = (self.client, self.shop, self.access_token);
        let title = match kind {
            ContentType::Product => client.get_product(shop, token, id).await?.map(|i| i.title),
            ContentType::Collection => client
                .get_collection(shop, token, id)
                .await?
                .map(|i| i.title),
            ContentType::Page => client.get_page(shop, token, id).await?.map(|i| i.title),
            ContentType::Article => client
                .fetch_blogs(shop, token)
                .await?
                .into_iter()
                .flat_map(|b| b.articles)
                .find(|a| matches_content_id(Some(&a.id), Some(id)))
                .map(|a| a.title),
            ContentType::Blog => client
                .fetch_blogs(shop, token)
                .await?
                .into_iter()
                .find(|b| matches_content_id(Some(&b.id), Some(id)))
                .map(|b| b.title),
        };
        Ok(title)
    }

    async fn customer_purchased_product(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> Result<bool, CatalogError> {
        self.client
            .customer_purchased_product(self.shop, self.access_token, customer_id, product_id)
            .await
    }
}
