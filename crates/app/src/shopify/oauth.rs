//! Shopify signature checks and the OAuth install handshake.
//!
//! Three different signatures arrive from Shopify:
//!
//! - OAuth callbacks carry `hmac`: sorted `key=value` pairs joined by `&`
//! - App proxy requests carry `signature`: sorted `key=value` pairs with
//!   repeated keys joined by `,`, concatenated without a separator
//! - Our own `state` parameter, signed here and checked on the callback
//!
//! All three are HMAC-SHA256 over the app secret, hex encoded, and verified
//! in constant time.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use gallery_flow_core::ShopDomain;

type HmacSha256 = Hmac<Sha256>;

/// How long an install `state` stays valid.
pub const STATE_MAX_AGE_SECS: i64 = 600;

/// Shopify authorize URL for installing the app on `shop`.
///
/// # Errors
///
/// Returns an error if the resulting URL cannot be parsed.
pub fn authorization_url(
    shop: &ShopDomain,
    api_key: &str,
    scopes: &str,
    redirect_uri: &str,
    state: &str,
) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &format!("https://{shop}/admin/oauth/authorize"),
        &[
            ("client_id", api_key),
            ("scope", scopes),
            ("redirect_uri", redirect_uri),
            ("state", state),
        ],
    )
}

fn mac_for(secret: &str) -> Option<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes()).ok()
}

fn sign(secret: &str, message: &str) -> Option<String> {
    let mut mac = mac_for(secret)?;
    mac.update(message.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn verify(secret: &str, message: &str, provided_hex: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex) else {
        return false;
    };
    let Some(mut mac) = mac_for(secret) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Verify the `hmac` parameter of an OAuth callback or admin launch URL.
#[must_use]
pub fn verify_shopify_hmac(params: &[(String, String)], secret: &str) -> bool {
    let Some((_, provided)) = params.iter().find(|(k, _)| k == "hmac") else {
        return false;
    };

    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, _)| k != "hmac" && k != "signature")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort_unstable();

    let message = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    verify(secret, &message, provided)
}

/// Verify the `signature` parameter Shopify adds to app proxy requests.
#[must_use]
pub fn verify_proxy_signature(params: &[(String, String)], secret: &str) -> bool {
    let Some((_, provided)) = params.iter().find(|(k, _)| k == "signature") else {
        return false;
    };

    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (k, v) in params.iter().filter(|(k, _)| k != "signature") {
        grouped.entry(k.as_str()).or_default().push(v.as_str());
    }

    let message: String = grouped
        .iter()
        .map(|(k, values)| format!("{k}={}", values.join(",")))
        .collect();

    verify(secret, &message, provided)
}

/// Sign a fresh install `state`: `{nonce}.{issued_at}.{mac}`.
#[must_use]
pub fn sign_state(secret: &str, issued_at: i64) -> Option<String> {
    let payload = format!("{}.{issued_at}", uuid::Uuid::new_v4().simple());
    let mac = sign(secret, &payload)?;
    Some(format!("{payload}.{mac}"))
}

/// Check a `state` produced by [`sign_state`] and not older than [`STATE_MAX_AGE_SECS`].
#[must_use]
pub fn verify_state(secret: &str, state: &str, now: i64) -> bool {
    let Some((payload, mac)) = state.rsplit_once('.') else {
        return false;
    };
    let Some(issued_at) = payload
        .split_once('.')
        .and_then(|(_, ts)| ts.parse::<i64>().ok())
    else {
        return false;
    };
    if now < issued_at || now - issued_at > STATE_MAX_AGE_SECS {
        return false;
    }
    verify(secret, payload, mac)
}
