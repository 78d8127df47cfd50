//! Core types for Gallery Flow.
//!
//! This module provides type-safe wrappers for the gallery domain.

pub mod content_ref;
pub mod email;
pub mod id;
pub mod shop;
pub mod status;
pub mod target;

pub use content_ref::{extract_id, matches_content_id};
pub use email::{Email, EmailError};
pub use id::*;
pub use shop::{DEFAULT_STORE_SUFFIX, ShopDomain, ShopDomainError};
pub use status::*;
pub use target::TargetRef;
