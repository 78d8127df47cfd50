//! Gallery Flow Core - Shared domain types.
//!
//! This crate provides the types shared by the gallery service and its CLI:
//! - `app` - Shopify app backend (storefront gallery API + merchant admin API)
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The rules that decide whether two catalog
//! references name the same item, and how an opaque upload target is
//! classified, live here so every caller applies them the same way.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, moderation statuses, content types, shop domains,
//!   content references and upload targets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
