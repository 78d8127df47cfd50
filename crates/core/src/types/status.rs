//! Status and category enums for gallery entities.

use serde::{Deserialize, Serialize};

/// Moderation state shared by uploads and images.
///
/// Uploads and images move through this state machine independently. There is
/// no terminal lock: a declined item can be approved later and vice versa.
///
/// The serialized spellings (`Pending`, `approved`, `declined`) are the values
/// the storefront theme extension and the stored rows already use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "gallery.moderation_status"))]
pub enum ModerationStatus {
    #[default]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Pending"))]
    Pending,
    #[serde(rename = "approved")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "approved"))]
    Approved,
    #[serde(rename = "declined")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "declined"))]
    Declined,
}

impl ModerationStatus {
    /// Whether this status allows storefront display.
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// The stored/serialized spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Pending" | "pending" => Ok(Self::Pending),
            "approved" | "Approved" => Ok(Self::Approved),
            "declined" | "Declined" => Ok(Self::Declined),
            other => Err(format!("invalid moderation status: {other}")),
        }
    }
}

/// Catalog category a gallery can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "gallery.content_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Product,
    Article,
    Blog,
    Collection,
    Page,
}

impl ContentType {
    /// All categories, in the order the catalog is presented to shoppers.
    pub const ALL: [Self; 5] = [
        Self::Product,
        Self::Article,
        Self::Blog,
        Self::Collection,
        Self::Page,
    ];

    /// Lowercase name used in query strings and stored rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Article => "article",
            Self::Blog => "blog",
            Self::Collection => "collection",
            Self::Page => "page",
        }
    }

    /// Generic human-readable label, used when a catalog title is unavailable.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Article => "Article",
            Self::Blog => "Blog",
            Self::Collection => "Collection",
            Self::Page => "Page",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(Self::Product),
            "article" => Ok(Self::Article),
            "blog" => Ok(Self::Blog),
            "collection" => Ok(Self::Collection),
            "page" => Ok(Self::Page),
            other => Err(format!("invalid content type: {other}")),
        }
    }
}

/// Which gallery-visibility policy a shop runs under.
///
/// Selected by the shop's `add_event_enabled` setting and loaded once per
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GalleryMode {
    /// Galleries are keyed by merchant-defined events.
    Event,
    /// Galleries are keyed directly by catalog items.
    Item,
}

impl GalleryMode {
    /// Map the stored `add_event_enabled` flag to a mode.
    #[must_use]
    pub const fn from_add_event_enabled(enabled: bool) -> Self {
        if enabled { Self::Event } else { Self::Item }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_status_serde_spelling() {
        assert_eq!(
            serde_json::to_string(&ModerationStatus::Pending).unwrap(),
            "\"Pending\""
        );
        assert_eq!(
            serde_json::to_string(&ModerationStatus::Approved).unwrap(),
            "\"approved\""
        );
        let parsed: ModerationStatus = serde_json::from_str("\"declined\"").unwrap();
        assert_eq!(parsed, ModerationStatus::Declined);
    }

    #[test]
    fn test_moderation_status_from_str() {
        assert_eq!(
            "approved".parse::<ModerationStatus>().unwrap(),
            ModerationStatus::Approved
        );
        assert_eq!(
            "pending".parse::<ModerationStatus>().unwrap(),
            ModerationStatus::Pending
        );
        assert!("archived".parse::<ModerationStatus>().is_err());
    }

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(ModerationStatus::default(), ModerationStatus::Pending);
        assert!(!ModerationStatus::default().is_approved());
    }

    #[test]
    fn test_content_type_round_trip_names() {
        for ct in ContentType::ALL {
            assert_eq!(ct.as_str().parse::<ContentType>().unwrap(), ct);
        }
        assert_eq!("Product".parse::<ContentType>().unwrap(), ContentType::Product);
        assert!("variant".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_gallery_mode_from_flag() {
        assert_eq!(GalleryMode::from_add_event_enabled(true), GalleryMode::Event);
        assert_eq!(GalleryMode::from_add_event_enabled(false), GalleryMode::Item);
    }
}
