//! Merchant moderation of uploads and images.
//!
//! Upload and image statuses are independent: approving an upload leaves its
//! images as they were. Any status can be set from any other, so repeating a
//! transition is harmless. Every mutation is scoped by shop.

use gallery_flow_core::{ImageId, ModerationStatus, ShopDomain, UploadId};
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::{ImageRepository, RepositoryError, UploadRepository};

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Missing data")]
    MissingData,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid type: {0}, expected gallery or image")]
    InvalidKind(String),

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ModerationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Body posted by the customer gallery screen.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRequest {
    pub action_type: Option<String>,
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// A parsed moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationCommand {
    DeleteUpload(UploadId),
    SetUploadStatus(UploadId, ModerationStatus),
    SetImageStatus(ImageId, ModerationStatus),
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl ModerationRequest {
    /// Turn the posted fields into a command.
    ///
    /// `actionType=delete` with an id deletes an upload. Otherwise `id`,
    /// `status` and `type` are all required.
    ///
    /// # Errors
    ///
    /// `MissingData`, `InvalidStatus`, `InvalidKind`, or `NotFound` for an id
    /// that cannot name any row.
    pub fn parse(&self) -> Result<ModerationCommand, ModerationError> {
        let id = non_empty(self.id.as_ref());

        if non_empty(self.action_type.as_ref()) == Some("delete")
            && let Some(id) = id
        {
            let id = UploadId::parse(id).map_err(|_| ModerationError::NotFound)?;
            return Ok(ModerationCommand::DeleteUpload(id));
        }

        let (Some(id), Some(status), Some(kind)) = (
            id,
            non_empty(self.status.as_ref()),
            non_empty(self.kind.as_ref()),
        ) else {
            return Err(ModerationError::MissingData);
        };

        let status: ModerationStatus = status
            .parse()
            .map_err(|_| ModerationError::InvalidStatus(status.to_string()))?;

        match kind {
            "gallery" => UploadId::parse(id)
                .map(|id| ModerationCommand::SetUploadStatus(id, status))
                .map_err(|_| ModerationError::NotFound),
            "image" => ImageId::parse(id)
                .map(|id| ModerationCommand::SetImageStatus(id, status))
                .map_err(|_| ModerationError::NotFound),
            other => Err(ModerationError::InvalidKind(other.to_string())),
        }
    }
}

/// Apply a command within one shop.
///
/// # Errors
///
/// `NotFound` if the target does not exist in the shop, `Repository` on
/// database failure.
#[tracing::instrument(skip(pool), fields(shop = %shop))]
pub async fn apply(
    pool: &PgPool,
    shop: &ShopDomain,
    command: ModerationCommand,
) -> Result<(), ModerationError> {
    match command {
        ModerationCommand::DeleteUpload(id) => {
            if !UploadRepository::new(pool).delete(shop, id).await? {
                return Err(ModerationError::NotFound);
            }
            tracing::info!(upload_id = %id, "Upload deleted");
        }
        ModerationCommand::SetUploadStatus(id, status) => {
            UploadRepository::new(pool).set_status(shop, id, status).await?;
        }
        ModerationCommand::SetImageStatus(id, status) => {
            ImageRepository::new(pool).set_status(shop, id, status).await?;
        }
    }

    Ok(())
}
