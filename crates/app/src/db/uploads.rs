//! Gallery upload repository.
//!
//! An upload is created together with all of its images in one transaction,
//! so a failed request never leaves an upload with a partial image set.

use std::collections::HashMap;

use gallery_flow_core::{ContentType, EventId, ImageId, ModerationStatus, ShopDomain, UploadId};
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;
use crate::models::{DashboardStats, Event, GalleryUpload, Image, UploadDetail, UploadWithImages};

const UPLOAD_COLUMNS: &str = "id, shop, customer_id, name, email, status, \
     event_id, item_id, item_type, item_name, created_at";

/// What a new upload is attached to. Exactly one linkage per upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadLinkage {
    Event(EventId),
    Item {
        item_id: String,
        item_type: ContentType,
        item_name: String,
    },
}

/// A submission about to be persisted.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub shop: ShopDomain,
    pub customer_id: String,
    pub name: Option<String>,
    pub email: String,
    pub linkage: UploadLinkage,
}

/// An image already transferred to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub url: String,
    pub public_id: Option<String>,
    pub alt_text: Option<String>,
}

/// Repository for `gallery.gallery_upload`.
pub struct UploadRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UploadRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an upload and its images atomically. Everything starts `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a constraint violation (e.g. the
    /// event vanished), `RepositoryError::Database` otherwise. Nothing is
    /// written on error.
    #[tracing::instrument(skip(self, new, images), fields(shop = %new.shop, images = images.len()))]
    pub async fn create_with_images(
        &self,
        new: &NewUpload,
        images: &[NewImage],
    ) -> Result<UploadId, RepositoryError> {
        let upload_id = UploadId::new();
        let (event_id, item_id, item_type, item_name) = match &new.linkage {
            UploadLinkage::Event(id) => (Some(*id), None, None, None),
            UploadLinkage::Item {
                item_id,
                item_type,
                item_name,
            } => (
                None,
                Some(item_id.as_str()),
                Some(*item_type),
                Some(item_name.as_str()),
            ),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO gallery.gallery_upload
                (id, shop, customer_id, name, email, status, event_id, item_id, item_type, item_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(upload_id)
        .bind(&new.shop)
        .bind(&new.customer_id)
        .bind(new.name.as_deref())
        .bind(&new.email)
        .bind(ModerationStatus::Pending)
        .bind(event_id)
        .bind(item_id)
        .bind(item_type)
        .bind(item_name)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from_write)?;

        for image in images {
            sqlx::query(
                r"
                INSERT INTO gallery.image (id, url, public_id, status, gallery_id, alt_text)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(ImageId::new())
            .bind(&image.url)
            .bind(image.public_id.as_deref())
            .bind(ModerationStatus::Pending)
            .bind(upload_id)
            .bind(image.alt_text.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_write)?;
        }

        tx.commit().await?;

        tracing::info!(upload_id = %upload_id, "Gallery upload created");
        Ok(upload_id)
    }

    /// Approved item-linked uploads of one content type, each with its
    /// approved images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn approved_item_uploads(
        &self,
        shop: &ShopDomain,
        item_type: ContentType,
    ) -> Result<Vec<UploadWithImages>, RepositoryError> {
        let uploads = sqlx::query_as::<_, GalleryUpload>(&format!(
            "SELECT {UPLOAD_COLUMNS} FROM gallery.gallery_upload
             WHERE shop = $1 AND item_type = $2 AND status = $3
             ORDER BY created_at, id"
        ))
        .bind(shop)
        .bind(item_type)
        .bind(ModerationStatus::Approved)
        .fetch_all(self.pool)
        .await?;

        attach_images(self.pool, uploads, Some(ModerationStatus::Approved)).await
    }

    /// Every upload of a shop, newest first, with all images and the linked
    /// event if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<UploadDetail>, RepositoryError> {
        let uploads = sqlx::query_as::<_, GalleryUpload>(&format!(
            "SELECT {UPLOAD_COLUMNS} FROM gallery.gallery_upload
             WHERE shop = $1
             ORDER BY created_at DESC, id"
        ))
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        self.with_events(uploads).await
    }

    /// Uploads of a shop whose customer id ends with `customer_suffix`.
    ///
    /// Admin links carry the bare numeric id while uploads may store the
    /// full `gid://` form, hence the suffix match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_customer(
        &self,
        shop: &ShopDomain,
        customer_suffix: &str,
    ) -> Result<Vec<UploadDetail>, RepositoryError> {
        let uploads = sqlx::query_as::<_, GalleryUpload>(&format!(
            "SELECT {UPLOAD_COLUMNS} FROM gallery.gallery_upload
             WHERE shop = $1 AND right(customer_id, length($2)) = $2
             ORDER BY created_at DESC, id"
        ))
        .bind(shop)
        .bind(customer_suffix)
        .fetch_all(self.pool)
        .await?;

        self.with_events(uploads).await
    }

    /// Set the status of one upload. Its images keep their own status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the upload does not belong to the shop.
    pub async fn set_status(
        &self,
        shop: &ShopDomain,
        id: UploadId,
        status: ModerationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE gallery.gallery_upload SET status = $3 WHERE id = $1 AND shop = $2",
        )
        .bind(id)
        .bind(shop)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::info!(shop = %shop, upload_id = %id, %status, "Upload status set");
        Ok(())
    }

    /// Delete an upload; its images cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain, id: UploadId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM gallery.gallery_upload WHERE id = $1 AND shop = $2")
            .bind(id)
            .bind(shop)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every upload (and image) a customer email submitted to a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_email(
        &self,
        shop: &ShopDomain,
        email: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM gallery.gallery_upload WHERE shop = $1 AND email = $2")
            .bind(shop)
            .bind(email)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Shop owning the first item-linked upload whose item id contains `reference`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_shop_by_item_id(
        &self,
        reference: &str,
    ) -> Result<Option<ShopDomain>, RepositoryError> {
        let shop = sqlx::query_scalar::<_, ShopDomain>(
            r"
            SELECT shop FROM gallery.gallery_upload
            WHERE item_id IS NOT NULL AND strpos(item_id, $1) > 0
            ORDER BY created_at
            LIMIT 1
            ",
        )
        .bind(reference)
        .fetch_optional(self.pool)
        .await?;

        Ok(shop)
    }

    /// Dashboard counters for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self, shop: &ShopDomain) -> Result<DashboardStats, RepositoryError> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r"
            SELECT
                (SELECT COUNT(DISTINCT email) FROM gallery.gallery_upload WHERE shop = $1)
                    AS customers,
                COUNT(i.id) AS submitted_images,
                COUNT(i.id) FILTER (WHERE i.status = 'approved') AS approved_images,
                COUNT(i.id) FILTER (WHERE i.status = 'declined') AS declined_images
            FROM gallery.image i
            JOIN gallery.gallery_upload u ON u.id = i.gallery_id
            WHERE u.shop = $1
            ",
        )
        .bind(shop)
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// Remove uploads that have no images, across all shops.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_empty(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM gallery.gallery_upload u
            WHERE NOT EXISTS (SELECT 1 FROM gallery.image i WHERE i.gallery_id = u.id)
            ",
        )
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn with_events(
        &self,
        uploads: Vec<GalleryUpload>,
    ) -> Result<Vec<UploadDetail>, RepositoryError> {
        let event_ids: Vec<Uuid> = uploads
            .iter()
            .filter_map(|u| u.event_id.map(|id| id.as_uuid()))
            .collect();
        let events: HashMap<EventId, Event> = if event_ids.is_empty() {
            HashMap::new()
        } else {
            sqlx::query_as::<_, Event>(
                r"
                SELECT id, shop, name, type, shopify_id, date, created_at
                FROM gallery.event
                WHERE id = ANY($1)
                ",
            )
            .bind(&event_ids)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect()
        };

        let uploads = attach_images(self.pool, uploads, None).await?;
        Ok(uploads
            .into_iter()
            .map(|u| {
                let event = u.upload.event_id.and_then(|id| events.get(&id).cloned());
                UploadDetail {
                    upload: u.upload,
                    images: u.images,
                    event,
                }
            })
            .collect())
    }
}

/// Load the images of `uploads` (optionally only those with `status`) and
/// pair them up, preserving upload order.
pub(super) async fn attach_images(
    pool: &PgPool,
    uploads: Vec<GalleryUpload>,
    status: Option<ModerationStatus>,
) -> Result<Vec<UploadWithImages>, RepositoryError> {
    if uploads.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = uploads.iter().map(|u| u.id.as_uuid()).collect();
    let images = sqlx::query_as::<_, Image>(
        r"
        SELECT id, url, public_id, status, gallery_id, alt_text, created_at
        FROM gallery.image
        WHERE gallery_id = ANY($1) AND ($2::gallery.moderation_status IS NULL OR status = $2)
        ORDER BY created_at, id
        ",
    )
    .bind(&ids)
    .bind(status)
    .fetch_all(pool)
    .await?;

    let mut by_upload: HashMap<UploadId, Vec<Image>> = HashMap::new();
    for image in images {
        by_upload.entry(image.gallery_id).or_default().push(image);
    }

    Ok(uploads
        .into_iter()
        .map(|upload| {
            let images = by_upload.remove(&upload.id).unwrap_or_default();
            UploadWithImages { upload, images }
        })
        .collect())
}
