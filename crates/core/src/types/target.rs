//! Upload target classification.

use serde::{Deserialize, Serialize};

use super::{ContentType, EventId};

/// What a shopper's upload is attached to.
///
/// Produced once by [`TargetRef::classify`]; callers match on it exhaustively
/// instead of sniffing the raw id again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TargetRef {
    /// A merchant event (the id parsed as one of our event UUIDs).
    Event(EventId),
    Product(String),
    Article(String),
    Blog(String),
    Collection(String),
    Page(String),
    /// Neither an event id nor a recognizable catalog id.
    Unknown(String),
}

impl TargetRef {
    /// Classify a raw target id.
    ///
    /// A UUID is an event candidate. Otherwise the catalog kind is read from
    /// the type token inside the global id, checked in the order `Product`,
    /// `Article`, `Blog`, `Collection`, `Page`.
    ///
    /// ```
    /// use gallery_flow_core::TargetRef;
    ///
    /// assert!(matches!(
    ///     TargetRef::classify("gid://shopify/Product/55"),
    ///     TargetRef::Product(_)
    /// ));
    /// assert!(matches!(TargetRef::classify("55"), TargetRef::Unknown(_)));
    /// ```
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(id) = EventId::parse(raw) {
            return Self::Event(id);
        }

        let owned = raw.to_owned();
        if raw.contains("Product") {
            Self::Product(owned)
        } else if raw.contains("Article") {
            Self::Article(owned)
        } else if raw.contains("Blog") {
            Self::Blog(owned)
        } else if raw.contains("Collection") {
            Self::Collection(owned)
        } else if raw.contains("Page") {
            Self::Page(owned)
        } else {
            Self::Unknown(owned)
        }
    }

    /// Catalog kind, or `None` for events and unknown ids.
    #[must_use]
    pub const fn content_type(&self) -> Option<ContentType> {
        match self {
            Self::Product(_) => Some(ContentType::Product),
            Self::Article(_) => Some(ContentType::Article),
            Self::Blog(_) => Some(ContentType::Blog),
            Self::Collection(_) => Some(ContentType::Collection),
            Self::Page(_) => Some(ContentType::Page),
            Self::Event(_) | Self::Unknown(_) => None,
        }
    }

    /// Catalog id for item targets.
    #[must_use]
    pub fn catalog_id(&self) -> Option<&str> {
        match self {
            Self::Product(id)
            | Self::Article(id)
            | Self::Blog(id)
            | Self::Collection(id)
            | Self::Page(id) => Some(id),
            Self::Event(_) | Self::Unknown(_) => None,
        }
    }
}
