//! CORS for storefront-facing routes.
//!
//! Only origins whose host ends with the configured store domain suffix are
//! echoed back. Any other origin gets no `Access-Control-Allow-Origin` and the
//! browser blocks the response. Preflight `OPTIONS` requests always answer 204.

use axum::{
    extract::Request,
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Whether `origin` is an https origin whose host ends with `suffix`.
#[must_use]
pub fn allowed_origin(origin: &str, suffix: &str) -> bool {
    let Ok(url) = url::Url::parse(origin) else {
        return false;
    };
    url.scheme() == "https"
        && url
            .host_str()
            .is_some_and(|host| host.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase()))
}

/// CORS layer echoing store origins that end with `suffix`.
#[must_use]
pub fn storefront_cors(suffix: &str) -> CorsLayer {
    let suffix = suffix.to_string();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| allowed_origin(origin, &suffix))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

/// Answers every `OPTIONS` request with 204, keeping the CORS headers set
/// by [`storefront_cors`]. Must wrap the CORS layer.
pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_options {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}
