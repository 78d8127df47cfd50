//! Authentication extractors.
//!
//! - [`RequireMerchant`]: embedded-admin routes. The app bridge sends a
//!   session token (HS256 JWT signed with the app secret) as a bearer token;
//!   the shop comes from its `dest` claim.
//! - [`LiveShop`]: storefront routes. Tries the same bearer token, then a
//!   signed app proxy query string. Never rejects; `None` means identity
//!   resolution falls back to the request's `shop` value.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use gallery_flow_core::ShopDomain;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::error::AppError;
use crate::shopify::oauth::verify_proxy_signature;
use crate::state::AppState;

/// Claims of a Shopify session token. Only the ones checked here.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    iss: String,
    dest: String,
}

#[derive(Debug, Error)]
pub enum SessionTokenError {
    #[error("invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("session token issuer does not match its destination")]
    IssuerMismatch,

    #[error("session token destination is not a shop: {0}")]
    InvalidDestination(String),
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Verify a session token and return the shop it was issued for.
///
/// # Errors
///
/// Fails on a bad signature, expiry, wrong audience, an issuer on another
/// host than `dest`, or a `dest` outside the store suffix.
pub fn decode_session_token(
    token: &str,
    api_key: &str,
    api_secret: &str,
    suffix: &str,
) -> Result<ShopDomain, SessionTokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[api_key]);
    validation.validate_nbf = true;

    let claims = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(api_secret.as_bytes()),
        &validation,
    )?
    .claims;

    let dest_host = host_of(&claims.dest)
        .ok_or_else(|| SessionTokenError::InvalidDestination(claims.dest.clone()))?;
    if host_of(&claims.iss).as_deref() != Some(dest_host.as_str()) {
        return Err(SessionTokenError::IssuerMismatch);
    }

    ShopDomain::parse_with_suffix(&dest_host, suffix)
        .map_err(|_| SessionTokenError::InvalidDestination(claims.dest))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn merchant_from_bearer(parts: &Parts, state: &AppState) -> Option<Result<ShopDomain, SessionTokenError>> {
    let token = bearer_token(parts)?;
    let shopify = &state.config().shopify;
    Some(decode_session_token(
        token,
        &shopify.api_key,
        shopify.api_secret.expose_secret(),
        &shopify.store_domain_suffix,
    ))
}

/// Shop of a correctly signed app proxy request.
#[must_use]
pub fn shop_from_proxy_query(query: &str, api_secret: &str, suffix: &str) -> Option<ShopDomain> {
    let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    if !verify_proxy_signature(&params, api_secret) {
        return None;
    }
    params
        .iter()
        .find(|(k, _)| k == "shop")
        .and_then(|(_, shop)| ShopDomain::parse_with_suffix(shop, suffix).ok())
}

/// Extractor requiring an embedded-admin session token.
///
/// ```rust,ignore
/// async fn dashboard(RequireMerchant(shop): RequireMerchant) -> impl IntoResponse {
///     format!("Hello, {shop}!")
/// }
/// ```
pub struct RequireMerchant(pub ShopDomain);

impl FromRequestParts<AppState> for RequireMerchant {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match merchant_from_bearer(parts, state) {
            Some(Ok(shop)) => {
                sentry::configure_scope(|scope| scope.set_tag("shop", shop.as_str()));
                Ok(Self(shop))
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Rejected session token");
                Err(AppError::Unauthorized("Invalid session token".to_string()))
            }
            None => Err(AppError::Unauthorized("Missing session token".to_string())),
        }
    }
}

/// Extractor for the live-authenticated shop, if any.
pub struct LiveShop(pub Option<ShopDomain>);

impl FromRequestParts<AppState> for LiveShop {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match merchant_from_bearer(parts, state) {
            Some(Ok(shop)) => return Ok(Self(Some(shop))),
            Some(Err(e)) => tracing::debug!(error = %e, "Session token unusable, trying app proxy"),
            None => {}
        }

        let shopify = &state.config().shopify;
        let shop = parts.uri.query().and_then(|q| {
            shop_from_proxy_query(
                q,
                shopify.api_secret.expose_secret(),
                &shopify.store_domain_suffix,
            )
        });

        Ok(Self(shop))
    }
}
