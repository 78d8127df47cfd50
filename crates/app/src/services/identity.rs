//! Identity resolution: which shop is acting, and with which access token.
//!
//! A request first tries live authentication (an embedded-admin session token
//! or an app proxy signature, checked by the extractors in
//! [`crate::middleware::auth`]). When that is unavailable, the `shop` value
//! sent with the request is used instead. Either way the offline access token
//! comes from the persisted session saved at install time.

use gallery_flow_core::{ShopDomain, ShopDomainError};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::{RepositoryError, SessionRepository};

/// A shop together with the token used for Admin API calls.
#[derive(Clone)]
pub struct ShopCredential {
    pub shop: ShopDomain,
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopCredential")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no shop provided")]
    NoShopProvided,

    #[error("no stored session for {0}")]
    NoSessionFound(ShopDomain),

    #[error("invalid shop: {0}")]
    InvalidShop(#[from] ShopDomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Pick the acting shop: the authenticated one if any, else the request's
/// `shop` value.
///
/// # Errors
///
/// Returns `NoShopProvided` if neither is present, `InvalidShop` if the
/// fallback value is not a store domain.
pub fn select_shop(
    live: Option<ShopDomain>,
    fallback: Option<&str>,
    suffix: &str,
) -> Result<ShopDomain, IdentityError> {
    if let Some(shop) = live {
        return Ok(shop);
    }

    match fallback.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => {
            tracing::debug!(shop = raw, "Live authentication unavailable, using request shop");
            Ok(ShopDomain::parse_with_suffix(raw, suffix)?)
        }
        None => Err(IdentityError::NoShopProvided),
    }
}

/// Resolve the acting shop and its stored access token.
///
/// # Errors
///
/// Returns `NoShopProvided`/`InvalidShop` from [`select_shop`],
/// `NoSessionFound` if the shop never completed install, and
/// `Repository` on database failure.
pub async fn resolve_credential(
    pool: &PgPool,
    live: Option<ShopDomain>,
    fallback: Option<&str>,
    suffix: &str,
) -> Result<ShopCredential, IdentityError> {
    let shop = select_shop(live, fallback, suffix)?;

    let session = SessionRepository::new(pool)
        .get_by_shop(&shop)
        .await?
        .ok_or_else(|| IdentityError::NoSessionFound(shop.clone()))?;

    Ok(ShopCredential {
        shop: session.shop,
        access_token: session.access_token,
    })
}
