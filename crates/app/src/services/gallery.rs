//! Gallery resolution: which approved images a storefront block shows.
//!
//! The shop's mode decides where images come from:
//!
//! - **Event mode**: the first of the shop's events whose catalog reference
//!   matches the content id, and its approved uploads.
//! - **Item mode**: the shop's approved uploads of the requested content type
//!   whose item id matches the content id.
//!
//! Content ids match by suffix identity (see [`gallery_flow_core::extract_id`]).
//! An image is shown only when both it and its upload are approved. Finding
//! nothing is a normal outcome and renders as `approved: false` with a debug
//! payload rather than an error.

use std::str::FromStr;

use gallery_flow_core::{ContentType, GalleryMode, ShopDomain, matches_content_id};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use crate::db::{EventRepository, RepositoryError, SettingRepository, UploadRepository};
use crate::models::{EventGallery, Image, UploadWithImages};

/// Message sent when nothing is approved yet.
pub const EMPTY_MESSAGE: &str = "No approved gallery uploads found";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("contentId and contentType are required")]
    MissingParameters,

    #[error("unsupported content type: {0}")]
    InvalidContentType(String),

    #[error("no settings found for {0}")]
    SettingNotFound(ShopDomain),

    #[error("could not determine the shop for this content")]
    ShopUnresolved,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Raw query string of a gallery request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryQuery {
    pub content_id: Option<String>,
    pub content_type: Option<String>,
    pub shop: Option<String>,
}

/// A validated gallery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRequest {
    pub content_id: String,
    pub content_type: ContentType,
}

impl GalleryQuery {
    /// Validate the content parameters.
    ///
    /// # Errors
    ///
    /// `MissingParameters` if either is absent or blank, `InvalidContentType`
    /// if the type is not a catalog category.
    pub fn parse(&self) -> Result<GalleryRequest, ResolveError> {
        let content_id = non_blank(self.content_id.as_deref());
        let content_type = non_blank(self.content_type.as_deref());
        let (Some(content_id), Some(content_type)) = (content_id, content_type) else {
            return Err(ResolveError::MissingParameters);
        };

        let content_type = ContentType::from_str(content_type)
            .map_err(|_| ResolveError::InvalidContentType(content_type.to_string()))?;

        Ok(GalleryRequest {
            content_id: content_id.to_string(),
            content_type,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// One image as the storefront renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryImage {
    pub url: String,
    pub alt: String,
}

impl From<&Image> for GalleryImage {
    fn from(image: &Image) -> Self {
        Self {
            url: image.url.clone(),
            alt: image
                .alt_text
                .clone()
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| format!("Gallery image {}", image.id)),
        }
    }
}

/// Diagnostics returned with an empty gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyGalleryDebug {
    pub shop: ShopDomain,
    pub content_id: String,
    pub content_type: ContentType,
    pub mode: GalleryMode,
    pub add_event_enabled: bool,
}

/// Outcome of resolving a gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GalleryResolution {
    Approved {
        approved: bool,
        images: Vec<GalleryImage>,
    },
    Empty {
        approved: bool,
        message: &'static str,
        debug: EmptyGalleryDebug,
    },
}

impl GalleryResolution {
    /// `Approved` when any image survived, `Empty` with diagnostics otherwise.
    #[must_use]
    pub fn from_images(images: Vec<GalleryImage>, debug: EmptyGalleryDebug) -> Self {
        if images.is_empty() {
            Self::Empty {
                approved: false,
                message: EMPTY_MESSAGE,
                debug,
            }
        } else {
            Self::Approved {
                approved: true,
                images,
            }
        }
    }

    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    #[must_use]
    pub fn images(&self) -> &[GalleryImage] {
        match self {
            Self::Approved { images, .. } => images,
            Self::Empty { .. } => &[],
        }
    }
}

fn approved_images<'a>(
    uploads: impl IntoIterator<Item = &'a UploadWithImages>,
) -> Vec<GalleryImage> {
    uploads
        .into_iter()
        .filter(|u| u.upload.status.is_approved())
        .flat_map(|u| u.images.iter())
        .filter(|i| i.status.is_approved())
        .map(GalleryImage::from)
        .collect()
}

/// Images of the first event whose catalog reference matches `content_id`.
#[must_use]
pub fn select_event_images(events: &[EventGallery], content_id: &str) -> Vec<GalleryImage> {
    events
        .iter()
        .find(|e| matches_content_id(Some(&e.event.shopify_id), Some(content_id)))
        .map(|e| approved_images(&e.uploads))
        .unwrap_or_default()
}

/// Images of every item upload whose item id matches `content_id`.
#[must_use]
pub fn select_item_images(uploads: &[UploadWithImages], content_id: &str) -> Vec<GalleryImage> {
    approved_images(
        uploads
            .iter()
            .filter(|u| matches_content_id(u.upload.item_id.as_deref(), Some(content_id))),
    )
}

/// Resolve the gallery for one piece of content.
///
/// # Errors
///
/// Returns `SettingNotFound` if the shop has never been set up, and
/// `Repository` on database failure.
#[tracing::instrument(skip(pool), fields(shop = %shop))]
pub async fn resolve(
    pool: &PgPool,
    shop: &ShopDomain,
    request: &GalleryRequest,
) -> Result<GalleryResolution, ResolveError> {
    let setting = SettingRepository::new(pool)
        .get(shop)
        .await?
        .ok_or_else(|| ResolveError::SettingNotFound(shop.clone()))?;
    let mode = setting.mode();

    let images = match mode {
        GalleryMode::Event => {
            let events = EventRepository::new(pool)
                .events_with_approved_uploads(shop)
                .await?;
            select_event_images(&events, &request.content_id)
        }
        GalleryMode::Item => {
            let uploads = UploadRepository::new(pool)
                .approved_item_uploads(shop, request.content_type)
                .await?;
            select_item_images(&uploads, &request.content_id)
        }
    };

    tracing::debug!(?mode, images = images.len(), "Gallery resolved");

    Ok(GalleryResolution::from_images(
        images,
        EmptyGalleryDebug {
            shop: shop.clone(),
            content_id: request.content_id.clone(),
            content_type: request.content_type,
            mode,
            add_event_enabled: setting.add_event_enabled,
        },
    ))
}

/// Find the shop that owns a content id when the request did not say.
///
/// Events are searched by catalog reference first, then item uploads.
///
/// # Errors
///
/// Returns `ShopUnresolved` if neither search finds a shop.
pub async fn infer_shop(pool: &PgPool, content_id: &str) -> Result<ShopDomain, ResolveError> {
    let reference = gallery_flow_core::extract_id(content_id);
    if reference.is_empty() {
        return Err(ResolveError::ShopUnresolved);
    }

    if let Some(shop) = EventRepository::new(pool)
        .find_shop_by_shopify_id(reference)
        .await?
    {
        return Ok(shop);
    }

    UploadRepository::new(pool)
        .find_shop_by_item_id(reference)
        .await?
        .ok_or(ResolveError::ShopUnresolved)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use gallery_flow_core::{EventId, ImageId, ModerationStatus, UploadId};

    use super::*;
    use crate::models::{Event, GalleryUpload};

    fn shop() -> ShopDomain {
        ShopDomain::parse("demo.myshopify.com").unwrap()
    }

    fn upload(status: ModerationStatus, item_id: Option<&str>) -> GalleryUpload {
        GalleryUpload {
            id: UploadId::new(),
            shop: shop(),
            customer_id: "gid://shopify/Customer/1".to_string(),
            name: None,
            email: "a@example.com".to_string(),
            status,
            event_id: None,
            item_id: item_id.map(str::to_string),
            item_type: item_id.map(|_| ContentType::Product),
            item_name: None,
            created_at: Utc::now(),
        }
    }

    fn image(upload: &GalleryUpload, status: ModerationStatus, url: &str) -> Image {
        Image {
            id: ImageId::new(),
            url: url.to_string(),
            public_id: None,
            status,
            gallery_id: upload.id,
            alt_text: None,
            created_at: Utc::now(),
        }
    }

    fn with_images(upload: GalleryUpload, images: &[(ModerationStatus, &str)]) -> UploadWithImages {
        let images = images
            .iter()
            .map(|(status, url)| image(&upload, *status, url))
            .collect();
        UploadWithImages { upload, images }
    }

    #[test]
    fn test_parse_requires_both_parameters() {
        let query = GalleryQuery {
            content_id: Some("55".to_string()),
            content_type: None,
            shop: None,
        };
        assert!(matches!(query.parse(), Err(ResolveError::MissingParameters)));

        let query = GalleryQuery {
            content_id: Some("  ".to_string()),
            content_type: Some("product".to_string()),
            shop: None,
        };
        assert!(matches!(query.parse(), Err(ResolveError::MissingParameters)));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let query = GalleryQuery {
            content_id: Some("55".to_string()),
            content_type: Some("video".to_string()),
            shop: None,
        };
        assert!(matches!(
            query.parse(),
            Err(ResolveError::InvalidContentType(t)) if t == "video"
        ));
    }

    #[test]
    fn test_item_images_match_by_suffix() {
        let uploads = vec![
            with_images(
                upload(ModerationStatus::Approved, Some("gid://shopify/Product/55")),
                &[(ModerationStatus::Approved, "https://img/1.png")],
            ),
            with_images(
                upload(ModerationStatus::Approved, Some("gid://shopify/Product/56")),
                &[(ModerationStatus::Approved, "https://img/2.png")],
            ),
        ];

        let images = select_item_images(&uploads, "55");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://img/1.png");
        assert_eq!(
            images[0].alt,
            format!("Gallery image {}", uploads[0].images[0].id)
        );
    }

    #[test]
    fn test_only_doubly_approved_images_are_shown() {
        let uploads = vec![
            with_images(
                upload(ModerationStatus::Approved, Some("55")),
                &[
                    (ModerationStatus::Approved, "https://img/ok.png"),
                    (ModerationStatus::Pending, "https://img/pending.png"),
                    (ModerationStatus::Declined, "https://img/declined.png"),
                ],
            ),
            with_images(
                upload(ModerationStatus::Declined, Some("55")),
                &[(ModerationStatus::Approved, "https://img/parent-declined.png")],
            ),
        ];

        let urls: Vec<String> = select_item_images(&uploads, "gid://shopify/Product/55")
            .into_iter()
            .map(|i| i.url)
            .collect();
        assert_eq!(urls, vec!["https://img/ok.png".to_string()]);
    }

    #[test]
    fn test_event_images_use_first_matching_event() {
        let make_event = |shopify_id: &str| Event {
            id: EventId::new(),
            shop: shop(),
            name: "Launch".to_string(),
            kind: ContentType::Product,
            shopify_id: shopify_id.to_string(),
            date: None,
            created_at: Utc::now(),
        };

        let events = vec![
            EventGallery {
                event: make_event("gid://shopify/Product/7"),
                uploads: vec![with_images(
                    upload(ModerationStatus::Approved, None),
                    &[(ModerationStatus::Approved, "https://img/seven.png")],
                )],
            },
            EventGallery {
                event: make_event("gid://shopify/Product/55"),
                uploads: vec![with_images(
                    upload(ModerationStatus::Approved, None),
                    &[(ModerationStatus::Approved, "https://img/first.png")],
                )],
            },
            EventGallery {
                event: make_event("55"),
                uploads: vec![with_images(
                    upload(ModerationStatus::Approved, None),
                    &[(ModerationStatus::Approved, "https://img/second.png")],
                )],
            },
        ];

        let images = select_event_images(&events, "55");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://img/first.png");
        assert!(select_event_images(&events, "999").is_empty());
    }

    #[test]
    fn test_alt_text_preferred_when_present() {
        let up = upload(ModerationStatus::Approved, Some("1"));
        let mut img = image(&up, ModerationStatus::Approved, "https://img/a.png");
        img.alt_text = Some("Sunset".to_string());
        assert_eq!(GalleryImage::from(&img).alt, "Sunset");
    }

    #[test]
    fn test_empty_resolution_renders_debug_payload() {
        let resolution = GalleryResolution::from_images(
            vec![],
            EmptyGalleryDebug {
                shop: shop(),
                content_id: "999".to_string(),
                content_type: ContentType::Product,
                mode: GalleryMode::Event,
                add_event_enabled: true,
            },
        );
        assert!(!resolution.is_approved());

        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["approved"], false);
        assert_eq!(json["message"], EMPTY_MESSAGE);
        assert_eq!(json["debug"]["contentId"], "999");
        assert_eq!(json["debug"]["contentType"], "product");
        assert_eq!(json["debug"]["mode"], "event");
        assert_eq!(json["debug"]["shop"], "demo.myshopify.com");
    }

    #[test]
    fn test_approved_resolution_renders_images() {
        let resolution = GalleryResolution::from_images(
            vec![GalleryImage {
                url: "https://img/1.png".to_string(),
                alt: "Gallery image x".to_string(),
            }],
            EmptyGalleryDebug {
                shop: shop(),
                content_id: "55".to_string(),
                content_type: ContentType::Product,
                mode: GalleryMode::Item,
                add_event_enabled: false,
            },
        );
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["approved"], true);
        assert_eq!(json["images"][0]["url"], "https://img/1.png");
        assert!(json.get("debug").is_none());
    }
}
