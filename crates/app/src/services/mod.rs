//! Request-independent workflows behind the HTTP routes.
//!
//! Each module takes its collaborators (pool, catalog, storage) as
//! parameters and returns its own error type; routes map those into
//! [`crate::error::AppError`].

pub mod customers;
pub mod events;
pub mod gallery;
pub mod identity;
pub mod intake;
pub mod moderation;
