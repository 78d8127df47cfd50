//! Image moderation.

use gallery_flow_core::{ImageId, ModerationStatus, ShopDomain};
use sqlx::PgPool;

use super::RepositoryError;

/// Repository for `gallery.image`.
pub struct ImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ImageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Set the status of one image, scoped through its upload's shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image does not belong to the shop.
    pub async fn set_status(
        &self,
        shop: &ShopDomain,
        id: ImageId,
        status: ModerationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE gallery.image SET status = $3
            WHERE id = $1
              AND gallery_id IN (SELECT id FROM gallery.gallery_upload WHERE shop = $2)
            ",
        )
        .bind(id)
        .bind(shop)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::info!(shop = %shop, image_id = %id, %status, "Image status set");
        Ok(())
    }
}
