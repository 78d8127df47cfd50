//! Request id propagation.
//!
//! Storefront calls arrive through Shopify's app proxy, which may already set
//! `x-request-id`. That value is kept; otherwise a UUID v4 is generated. The
//! id lands on the request span, as a Sentry tag, and on the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound id accepted as-is; longer values are replaced.
const MAX_INBOUND_LEN: usize = 128;

fn inbound_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_INBOUND_LEN)
        .map(String::from)
}

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = inbound_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_inbound_id_is_echoed() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "proxy-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "proxy-123");
    }

    #[tokio::test]
    async fn test_missing_or_oversized_id_is_generated() {
        let oversized = "x".repeat(MAX_INBOUND_LEN + 1);
        for inbound in [None, Some(oversized.as_str())] {
            let mut builder = Request::builder().uri("/");
            if let Some(id) = inbound {
                builder = builder.header(REQUEST_ID_HEADER, id);
            }
            let response = app()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap();
            let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
            assert!(Uuid::parse_str(id).is_ok());
        }
    }
}
