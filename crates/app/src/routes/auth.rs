//! App install: the Shopify OAuth handshake.
//!
//! `GET /auth/install?shop=` redirects to Shopify's authorize page with a
//! signed `state`. Shopify sends the merchant back to `GET /auth/callback`,
//! where the callback HMAC and the state are checked, the code is exchanged
//! for an offline token, and the token is stored as the shop's session.

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use chrono::Utc;
use gallery_flow_core::ShopDomain;
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::db::{SessionRepository, SettingRepository};
use crate::error::AppError;
use crate::routes::storefront::ShopQuery;
use crate::shopify::oauth::{authorization_url, sign_state, verify_shopify_hmac, verify_state};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/install", get(install))
        .route("/auth/callback", get(callback))
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// GET /auth/install - start the install flow.
#[instrument(skip_all)]
async fn install(
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Result<Redirect, AppError> {
    let raw = query
        .shop
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("No shop provided".to_string()))?;
    let shop = ShopDomain::parse_with_suffix(raw, state.store_suffix())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let config = state.config();
    let oauth_state = sign_state(
        config.shopify.api_secret.expose_secret(),
        Utc::now().timestamp(),
    )
    .ok_or_else(|| AppError::Internal("Failed to sign OAuth state".to_string()))?;

    let url = authorization_url(
        &shop,
        &config.shopify.api_key,
        &config.shopify.scopes,
        &config.oauth_redirect_uri(),
        &oauth_state,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(Redirect::to(url.as_str()))
}

/// GET /auth/callback - finish the install flow.
#[instrument(skip_all)]
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    let config = state.config();
    let secret = config.shopify.api_secret.expose_secret();

    if let Some(error) = param(&params, "error") {
        tracing::error!(error, "Shopify OAuth error");
        return Err(AppError::Unauthorized("OAuth authorization was denied".to_string()));
    }

    if !verify_shopify_hmac(&params, secret) {
        tracing::error!("Invalid HMAC signature in OAuth callback");
        return Err(AppError::Unauthorized("Invalid signature".to_string()));
    }

    let (Some(code), Some(oauth_state), Some(raw_shop)) = (
        param(&params, "code"),
        param(&params, "state"),
        param(&params, "shop"),
    ) else {
        return Err(AppError::BadRequest("Missing OAuth parameters".to_string()));
    };

    if !verify_state(secret, oauth_state, Utc::now().timestamp()) {
        tracing::error!("OAuth state invalid or expired");
        return Err(AppError::Unauthorized("Invalid state".to_string()));
    }

    let shop = ShopDomain::parse_with_suffix(raw_shop, state.store_suffix())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let token = state
        .catalog()
        .exchange_code(&shop, &config.shopify, code)
        .await?;

    SessionRepository::new(state.pool())
        .save(&shop, &token.access_token, &token.scope)
        .await?;
    SettingRepository::new(state.pool())
        .get_or_create(&shop)
        .await?;

    tracing::info!(shop = %shop, "App installed");
    Ok(Redirect::to(&format!(
        "https://{shop}/admin/apps/{}",
        config.shopify.api_key
    )))
}
