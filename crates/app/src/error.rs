//! Unified error handling for the gallery service.
//!
//! Every service error converts into [`AppError`], which renders as
//! `{"success": false, "error": "..."}` with the matching status code.
//! Server-side failures are logged with their detail and sent to Sentry; the
//! client only sees a generic message for those.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::events::EventError;
use crate::services::gallery::ResolveError;
use crate::services::identity::IdentityError;
use crate::services::intake::IntakeError;
use crate::services::moderation::ModerationError;
use crate::shopify::CatalogError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid client input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Caller could not be authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is known but the action is not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Catalog API or image storage failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Internal(_) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the client.
    fn client_message(&self) -> String {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m) => m.clone(),
            Self::Upstream(_) => "External service error".to_string(),
            Self::Internal(_) | Self::Database(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request failed"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = json!({
            "success": false,
            "error": self.client_message(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NoShopProvided => Self::BadRequest("No shop provided".to_string()),
            IdentityError::InvalidShop(e) => Self::BadRequest(e.to_string()),
            IdentityError::NoSessionFound(shop) => {
                Self::Unauthorized(format!("No session found for {shop}"))
            }
            IdentityError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::MissingParameters
            | ResolveError::InvalidContentType(_)
            | ResolveError::ShopUnresolved => Self::BadRequest(err.to_string()),
            ResolveError::SettingNotFound(_) => Self::NotFound(err.to_string()),
            ResolveError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::MissingFields(_)
            | IntakeError::InvalidEmail(_)
            | IntakeError::MissingFiles
            | IntakeError::TooManyFiles { .. }
            | IntakeError::FileTooLarge { .. }
            | IntakeError::InvalidTarget(_) => Self::BadRequest(err.to_string()),
            IntakeError::UploadsDisabled
            | IntakeError::UploadWindowClosed
            | IntakeError::PurchaseRequired => Self::Forbidden(err.to_string()),
            IntakeError::Catalog(_) | IntakeError::Storage(_) => Self::Upstream(err.to_string()),
            IntakeError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<ModerationError> for AppError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::MissingData
            | ModerationError::InvalidStatus(_)
            | ModerationError::InvalidKind(_) => Self::BadRequest(err.to_string()),
            ModerationError::NotFound => Self::NotFound(err.to_string()),
            ModerationError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::MissingFields
            | EventError::ItemNotFound(_)
            | EventError::MissingEventId
            | EventError::InvalidDate(_)
            | EventError::InvalidAction => Self::BadRequest(err.to_string()),
            EventError::EventsDisabled => Self::Forbidden(err.to_string()),
            EventError::NotFound => Self::NotFound(err.to_string()),
            EventError::Catalog(e) => e.into(),
            EventError::Repository(e) => Self::Database(e),
        }
    }
}
