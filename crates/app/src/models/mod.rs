//! Row and view models for the gallery schema.

use chrono::{DateTime, Utc};
use gallery_flow_core::{
    ContentType, EventId, GalleryMode, ImageId, ModerationStatus, ShopDomain, UploadId,
};
use serde::Serialize;

/// Per-shop configuration. One row per shop, created lazily with defaults.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub shop: ShopDomain,
    /// Event mode when true, item mode otherwise.
    pub add_event_enabled: bool,
    /// Only customers who ordered a product may upload against it.
    pub only_purchased_item: bool,
    pub fetch_variant_enabled: bool,
    /// Master switch for storefront uploads.
    pub uploads_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    #[must_use]
    pub const fn mode(&self) -> GalleryMode {
        GalleryMode::from_add_event_enabled(self.add_event_enabled)
    }
}

/// A merchant-defined, dated gallery target.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub shop: ShopDomain,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: ContentType,
    /// Catalog reference the event is attached to.
    pub shopify_id: String,
    pub date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Uploads are accepted once the event date has passed. Undated events
    /// never open.
    #[must_use]
    pub fn accepts_uploads_at(&self, now: DateTime<Utc>) -> bool {
        self.date.is_some_and(|date| date < now)
    }
}

/// One customer's submission batch.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GalleryUpload {
    pub id: UploadId,
    pub shop: ShopDomain,
    pub customer_id: String,
    pub name: Option<String>,
    pub email: String,
    pub status: ModerationStatus,
    pub event_id: Option<EventId>,
    pub item_id: Option<String>,
    pub item_type: Option<ContentType>,
    pub item_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One uploaded file.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: ImageId,
    pub url: String,
    /// Storage-side identifier, used to delete the asset.
    pub public_id: Option<String>,
    pub status: ModerationStatus,
    pub gallery_id: UploadId,
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadWithImages {
    #[serde(flatten)]
    pub upload: GalleryUpload,
    pub images: Vec<Image>,
}

/// Upload with its images and, for event-linked uploads, the event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDetail {
    #[serde(flatten)]
    pub upload: GalleryUpload,
    pub images: Vec<Image>,
    pub event: Option<Event>,
}

/// An event with its approved uploads, each carrying its approved images.
#[derive(Debug, Clone)]
pub struct EventGallery {
    pub event: Event,
    pub uploads: Vec<UploadWithImages>,
}

/// Aggregate counts for the merchant dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub customers: i64,
    pub submitted_images: i64,
    pub approved_images: i64,
    pub declined_images: i64,
}
