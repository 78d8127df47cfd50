//! Embedded-admin API used by the merchant screens.
//!
//! Every handler requires [`RequireMerchant`]; all reads and writes are
//! scoped to the shop in the session token.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use gallery_flow_core::ShopDomain;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::db::{EventRepository, SettingRepository, UploadRepository};
use crate::error::AppError;
use crate::middleware::RequireMerchant;
use crate::services::customers::{self, CustomerQuery};
use crate::services::events::{self, EventAction};
use crate::services::identity::{self, ShopCredential};
use crate::services::moderation::{self, ModerationRequest};
use crate::shopify::ShopCatalog;
use crate::state::AppState;

/// Products shown by the catalog check.
const CATALOG_SAMPLE: usize = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app/dashboard", get(dashboard))
        .route("/app/events", get(list_events).post(event_action))
        .route("/app/customers", get(list_customers).post(delete_customer))
        .route(
            "/app/customer-gallery/{customer_id}",
            get(customer_gallery).post(moderate),
        )
        .route("/app/catalog/products", get(catalog_products))
}

async fn credential(state: &AppState, shop: ShopDomain) -> Result<ShopCredential, AppError> {
    Ok(identity::resolve_credential(state.pool(), Some(shop), None, state.store_suffix()).await?)
}

/// GET /app/dashboard - counters and the current mode.
#[instrument(skip_all, fields(shop = %shop))]
async fn dashboard(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
) -> Result<Json<Value>, AppError> {
    let setting = SettingRepository::new(state.pool())
        .get_or_create(&shop)
        .await?;
    let stats = UploadRepository::new(state.pool()).stats(&shop).await?;

    Ok(Json(json!({
        "success": true,
        "shop": shop,
        "mode": setting.mode(),
        "stats": stats,
        "setting": setting,
    })))
}

/// GET /app/events - events, setting and the catalog to pick targets from.
#[instrument(skip_all, fields(shop = %shop))]
async fn list_events(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
) -> Result<Json<Value>, AppError> {
    let credential = credential(&state, shop).await?;
    let shop = &credential.shop;

    let setting = SettingRepository::new(state.pool())
        .get_or_create(shop)
        .await?;
    let events = EventRepository::new(state.pool()).list(shop).await?;
    let catalog = state
        .catalog()
        .fetch_catalog(shop, &credential.access_token)
        .await?;

    Ok(Json(json!({
        "success": true,
        "shop": shop,
        "events": events,
        "setting": setting,
        "products": catalog.products,
        "blogs": catalog.blogs,
        "collections": catalog.collections,
        "pages": catalog.pages,
    })))
}

/// POST /app/events - create, edit or delete an event, or toggle a setting.
#[instrument(skip_all, fields(shop = %shop))]
async fn event_action(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    Json(action): Json<EventAction>,
) -> Result<Json<Value>, AppError> {
    let command = action.parse()?;
    let credential = credential(&state, shop).await?;
    let catalog = ShopCatalog::new(state.catalog(), &credential.shop, &credential.access_token);

    events::apply(state.pool(), &credential.shop, &catalog, command).await?;

    Ok(Json(json!({ "success": true })))
}

/// GET /app/customers - uploads grouped by customer.
#[instrument(skip_all, fields(shop = %shop))]
async fn list_customers(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<Value>, AppError> {
    let uploads = UploadRepository::new(state.pool())
        .list_for_shop(&shop)
        .await?;
    let page = customers::paginate(customers::summarize(&uploads), &query);

    Ok(Json(json!({
        "success": true,
        "shop": shop,
        "customers": page.customers,
        "total": page.total,
        "page": page.page,
        "totalPages": page.total_pages,
    })))
}

#[derive(Debug, Deserialize)]
struct DeleteCustomerRequest {
    email: Option<String>,
}

/// POST /app/customers - delete everything one email uploaded.
#[instrument(skip_all, fields(shop = %shop))]
async fn delete_customer(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    Json(body): Json<DeleteCustomerRequest>,
) -> Result<Json<Value>, AppError> {
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing email".to_string()))?;

    let deleted = UploadRepository::new(state.pool())
        .delete_by_email(&shop, email)
        .await?;
    tracing::info!(deleted, "Customer uploads deleted");

    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

/// GET /app/customer-gallery/{customer_id} - one customer's uploads.
#[instrument(skip_all, fields(shop = %shop))]
async fn customer_gallery(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    Path(customer_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let customer_id = customer_id.trim();
    if customer_id.is_empty() {
        return Err(AppError::BadRequest("Missing customer id".to_string()));
    }

    let galleries = UploadRepository::new(state.pool())
        .list_for_customer(&shop, customer_id)
        .await?;
    let fetch_variant_enabled = SettingRepository::new(state.pool())
        .get(&shop)
        .await?
        .is_some_and(|s| s.fetch_variant_enabled);

    Ok(Json(json!({
        "success": true,
        "shop": shop,
        "customerId": customer_id,
        "galleries": galleries,
        "fetchVariantEnabled": fetch_variant_enabled,
    })))
}

/// POST /app/customer-gallery/{customer_id} - approve, decline or delete.
#[instrument(skip_all, fields(shop = %shop))]
async fn moderate(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    Json(request): Json<ModerationRequest>,
) -> Result<Json<Value>, AppError> {
    let command = request.parse()?;
    moderation::apply(state.pool(), &shop, command).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /app/catalog/products - Admin API connectivity check.
#[instrument(skip_all, fields(shop = %shop))]
async fn catalog_products(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
) -> Result<Json<Value>, AppError> {
    let credential = credential(&state, shop).await?;
    let products = state
        .catalog()
        .fetch_products(&credential.shop, &credential.access_token)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": products.len(),
        "products": products.iter().take(CATALOG_SAMPLE).collect::<Vec<_>>(),
    })))
}
