//! HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Database ping
//!
//! # Install (Shopify OAuth)
//! GET  /auth/install?shop=              - Redirect to the authorize page
//! GET  /auth/callback                   - Exchange the code, store the session
//!
//! # Storefront (CORS, app proxy or fallback shop)
//! GET  /api/gallery                     - Upload targets (catalog or past events)
//! POST /api/gallery                     - Submit an upload (multipart)
//! GET  /api/gallery-show                - Approved images for a content id
//! GET  /api/purchasetrue                - Purchase gate flag
//!
//! # Merchant admin (session token)
//! GET  /app/dashboard                   - Counters and mode
//! GET  /app/events                      - Events, setting, catalog
//! POST /app/events                      - Event actions and setting toggles
//! GET  /app/customers                   - Uploads grouped by customer
//! POST /app/customers                   - Delete a customer's uploads
//! GET  /app/customer-gallery/{id}       - One customer's uploads
//! POST /app/customer-gallery/{id}       - Approve / decline / delete
//! GET  /app/catalog/products            - Admin API check
//! ```

pub mod admin;
pub mod auth;
pub mod health;
pub mod storefront;

use axum::{Router, middleware};

use crate::middleware::{preflight_no_content, storefront_cors};
use crate::state::AppState;

/// All routes, with storefront CORS applied to `/api/*` only.
pub fn routes(state: &AppState) -> Router<AppState> {
    let storefront = storefront::router(state)
        .layer(storefront_cors(state.store_suffix()))
        .layer(middleware::from_fn(preflight_no_content));

    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(admin::router())
        .merge(storefront)
}
