//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (records into the span)
//! 4. Storefront preflight 204, then `CorsLayer` (`/api/*` only)

pub mod auth;
pub mod cors;
pub mod request_id;

pub use auth::{LiveShop, RequireMerchant};
pub use cors::{preflight_no_content, storefront_cors};
pub use request_id::request_id_middleware;
