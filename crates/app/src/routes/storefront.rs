//! Storefront API: the theme extension's gallery, upload and purchase-gate calls.
//!
//! These routes sit behind the storefront CORS layer. Identity comes from
//! [`LiveShop`] when the call is signed, otherwise from the `shop` value the
//! theme sends along.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use gallery_flow_core::{GalleryMode, ShopDomain};
use serde::Deserialize;
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::instrument;

use crate::db::{EventRepository, SettingRepository};
use crate::error::AppError;
use crate::middleware::LiveShop;
use crate::services::gallery::{self, GalleryQuery, ResolveError};
use crate::services::identity::{self, IdentityError};
use crate::services::intake::{self, ACCEPTED_MESSAGE, IntakeContext, IntakeForm};
use crate::shopify::ShopCatalog;
use crate::state::AppState;
use crate::storage::UploadFile;

pub fn router(state: &AppState) -> Router<AppState> {
    let body_limit = state.config().uploads.max_body_bytes();

    Router::new()
        .route(
            "/api/gallery",
            get(gallery_options).post(submit_upload).options(preflight),
        )
        .route("/api/gallery-show", get(gallery_show).options(preflight))
        .route("/api/purchasetrue", get(purchase_gate).options(preflight))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
}

#[derive(Debug, Default, Deserialize)]
pub struct ShopQuery {
    pub shop: Option<String>,
}

/// OPTIONS - answered by the CORS layer before reaching here.
async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// GET /api/gallery - what the upload form can target.
///
/// Item mode lists the catalog; event mode lists the shop's past events.
#[instrument(skip_all)]
async fn gallery_options(
    State(state): State<AppState>,
    LiveShop(live): LiveShop,
    Query(query): Query<ShopQuery>,
) -> Result<Response, AppError> {
    let credential = identity::resolve_credential(
        state.pool(),
        live,
        query.shop.as_deref(),
        state.store_suffix(),
    )
    .await?;

    let setting = SettingRepository::new(state.pool())
        .get_or_create(&credential.shop)
        .await?;

    let body = match setting.mode() {
        GalleryMode::Item => {
            let catalog = state
                .catalog()
                .fetch_catalog(&credential.shop, &credential.access_token)
                .await?;
            json!({
                "success": true,
                "disabled": true,
                "products": catalog.products,
                "blogs": catalog.blogs,
                "collections": catalog.collections,
                "pages": catalog.pages,
            })
        }
        GalleryMode::Event => {
            let events = EventRepository::new(state.pool())
                .list_past(&credential.shop, Utc::now())
                .await?;
            json!({
                "success": true,
                "disabled": false,
                "events": events,
            })
        }
    };

    Ok(Json(body).into_response())
}

fn multipart_error(e: &axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

/// Read the multipart upload form. Empty file inputs are skipped.
async fn read_form(mut multipart: Multipart) -> Result<IntakeForm, AppError> {
    let mut form = IntakeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            form.files.push(UploadFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let text = field.text().await.map_err(|e| multipart_error(&e))?;
        match name.as_str() {
            "customerId" => form.customer_id = Some(text),
            "name" => form.name = Some(text),
            "email" => form.email = Some(text),
            "targetId" => form.target_id = Some(text),
            "eventId" if form.target_id.is_none() => form.target_id = Some(text),
            "shop" => form.shop = Some(text),
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/gallery - submit an upload.
#[instrument(skip_all)]
async fn submit_upload(
    State(state): State<AppState>,
    LiveShop(live): LiveShop,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = read_form(multipart).await?;
    let fallback_shop = form.shop.take();
    let submission = form.validate(&state.config().uploads)?;

    let credential = identity::resolve_credential(
        state.pool(),
        live,
        fallback_shop.as_deref(),
        state.store_suffix(),
    )
    .await?;

    let catalog = ShopCatalog::new(state.catalog(), &credential.shop, &credential.access_token);
    let ctx = IntakeContext {
        pool: state.pool(),
        storage: state.storage(),
        catalog: &catalog,
        shop: &credential.shop,
        now: Utc::now(),
    };

    let upload_id = intake::accept(&ctx, submission).await?;
    tracing::info!(shop = %credential.shop, %upload_id, "Upload accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "success": true, "message": ACCEPTED_MESSAGE })),
    )
        .into_response())
}

/// Shop for a read-only storefront call. Nothing is looked up in the
/// session table, so no token is needed.
fn read_shop(
    live: Option<ShopDomain>,
    fallback: Option<&str>,
    suffix: &str,
) -> Result<Option<ShopDomain>, AppError> {
    match identity::select_shop(live, fallback, suffix) {
        Ok(shop) => Ok(Some(shop)),
        Err(IdentityError::NoShopProvided) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// GET /api/gallery-show - approved images for one piece of content.
#[instrument(skip_all)]
async fn gallery_show(
    State(state): State<AppState>,
    LiveShop(live): LiveShop,
    Query(query): Query<GalleryQuery>,
) -> Result<Response, AppError> {
    let request = query.parse()?;

    let shop = match read_shop(live, query.shop.as_deref(), state.store_suffix())? {
        Some(shop) => shop,
        None => gallery::infer_shop(state.pool(), &request.content_id)
            .await
            .map_err(|e| match e {
                ResolveError::ShopUnresolved => AppError::BadRequest("No shop provided".to_string()),
                other => other.into(),
            })?,
    };

    let resolution = gallery::resolve(state.pool(), &shop, &request).await?;
    Ok(Json(resolution).into_response())
}

/// GET /api/purchasetrue - whether uploads require a prior purchase.
#[instrument(skip_all)]
async fn purchase_gate(
    State(state): State<AppState>,
    LiveShop(live): LiveShop,
    Query(query): Query<ShopQuery>,
) -> Result<Response, AppError> {
    let shop = read_shop(live, query.shop.as_deref(), state.store_suffix())?
        .ok_or_else(|| AppError::BadRequest("No shop provided".to_string()))?;

    let only_purchased_item = SettingRepository::new(state.pool())
        .get(&shop)
        .await?
        .is_some_and(|s| s.only_purchased_item);

    Ok(Json(json!({
        "success": true,
        "onlyPurchasedItem": only_purchased_item,
    }))
    .into_response())
}
