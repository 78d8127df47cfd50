//! Event repository.

use chrono::{DateTime, Utc};
use gallery_flow_core::{ContentType, EventId, ModerationStatus, ShopDomain};
use sqlx::PgPool;

use super::RepositoryError;
use super::uploads::attach_images;
use crate::models::{Event, EventGallery, GalleryUpload, UploadWithImages};

const EVENT_COLUMNS: &str = "id, shop, name, type, shopify_id, date, created_at";

/// Fields written when creating or editing an event.
#[derive(Debug, Clone)]
pub struct EventInput {
    pub name: String,
    pub kind: ContentType,
    pub shopify_id: String,
    pub date: Option<DateTime<Utc>>,
}

/// Repository for `gallery.event`.
pub struct EventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All events of a shop, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, shop: &ShopDomain) -> Result<Vec<Event>, RepositoryError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM gallery.event
             WHERE shop = $1
             ORDER BY created_at DESC"
        ))
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        Ok(events)
    }

    /// Events of a shop dated before `now`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_past(
        &self,
        shop: &ShopDomain,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, RepositoryError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM gallery.event
             WHERE shop = $1 AND date < $2
             ORDER BY date DESC"
        ))
        .bind(shop)
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(events)
    }

    /// Find an event by id regardless of shop.
    ///
    /// Intake uses this to tell a foreign event apart from an unknown id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_any(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM gallery.event WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(event)
    }

    /// Create an event.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        shop: &ShopDomain,
        input: &EventInput,
    ) -> Result<Event, RepositoryError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO gallery.event (id, shop, name, type, shopify_id, date)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(EventId::new())
        .bind(shop)
        .bind(&input.name)
        .bind(input.kind)
        .bind(&input.shopify_id)
        .bind(input.date)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        tracing::info!(shop = %shop, event_id = %event.id, "Event created");
        Ok(event)
    }

    /// Update an event of a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such event belongs to the shop.
    pub async fn update(
        &self,
        shop: &ShopDomain,
        id: EventId,
        input: &EventInput,
    ) -> Result<Event, RepositoryError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE gallery.event
             SET name = $3, type = $4, shopify_id = $5, date = $6
             WHERE id = $1 AND shop = $2
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(shop)
        .bind(&input.name)
        .bind(input.kind)
        .bind(&input.shopify_id)
        .bind(input.date)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(event)
    }

    /// Delete an event of a shop. Its uploads and their images cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain, id: EventId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM gallery.event WHERE id = $1 AND shop = $2")
            .bind(id)
            .bind(shop)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every event of a shop (oldest first) with its approved uploads and
    /// their approved images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn events_with_approved_uploads(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<EventGallery>, RepositoryError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM gallery.event
             WHERE shop = $1
             ORDER BY created_at, id"
        ))
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        let uploads = sqlx::query_as::<_, GalleryUpload>(
            r"
            SELECT u.id, u.shop, u.customer_id, u.name, u.email, u.status,
                   u.event_id, u.item_id, u.item_type, u.item_name, u.created_at
            FROM gallery.gallery_upload u
            JOIN gallery.event e ON e.id = u.event_id
            WHERE e.shop = $1 AND u.shop = $1 AND u.status = $2
            ORDER BY u.created_at, u.id
            ",
        )
        .bind(shop)
        .bind(ModerationStatus::Approved)
        .fetch_all(self.pool)
        .await?;

        let mut uploads =
            attach_images(self.pool, uploads, Some(ModerationStatus::Approved)).await?;

        Ok(events
            .into_iter()
            .map(|event| {
                let (mine, rest): (Vec<UploadWithImages>, Vec<UploadWithImages>) = uploads
                    .drain(..)
                    .partition(|u| u.upload.event_id == Some(event.id));
                uploads = rest;
                EventGallery {
                    event,
                    uploads: mine,
                }
            })
            .collect())
    }

    /// Shop owning the first event whose catalog reference contains `reference`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_shop_by_shopify_id(
        &self,
        reference: &str,
    ) -> Result<Option<ShopDomain>, RepositoryError> {
        let shop = sqlx::query_scalar::<_, ShopDomain>(
            r"
            SELECT shop FROM gallery.event
            WHERE strpos(shopify_id, $1) > 0
            ORDER BY created_at
            LIMIT 1
            ",
        )
        .bind(reference)
        .fetch_optional(self.pool)
        .await?;

        Ok(shop)
    }
}
