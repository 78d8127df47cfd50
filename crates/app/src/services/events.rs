//! Merchant event management and setting toggles.

use chrono::{DateTime, NaiveDate, Utc};
use gallery_flow_core::{ContentType, EventId, ShopDomain};
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::{EventInput, EventRepository, RepositoryError, SettingFlag, SettingRepository};
use crate::shopify::{CatalogError, CatalogLookup};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Type and item are required")]
    MissingFields,

    #[error("Adding events is currently disabled.")]
    EventsDisabled,

    #[error("Failed to fetch item data for {0}")]
    ItemNotFound(String),

    #[error("Missing eventId")]
    MissingEventId,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid action")]
    InvalidAction,

    #[error("Event not found")]
    NotFound,

    #[error("catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for EventError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Body posted by the event management screen.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAction {
    pub action_type: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub item_id: Option<String>,
    pub date: Option<String>,
    pub event_id: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

/// What a create or edit refers to, before the title is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    /// Kind as selected; `Blog` means an article picked from a blog.
    pub kind: ContentType,
    pub item_id: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventCommand {
    Create(EventDraft),
    Edit(EventId, EventDraft),
    Delete(EventId),
    Toggle(SettingFlag, bool),
}

/// Parse an event date. Accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339.
/// A blank or missing date means the event is undated.
///
/// # Errors
///
/// `InvalidDate` when a non-blank value matches neither format.
pub fn parse_event_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, EventError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| EventError::InvalidDate(raw.to_string()))
}

fn parse_event_id(raw: Option<&String>) -> Result<EventId, EventError> {
    let raw = raw
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or(EventError::MissingEventId)?;
    EventId::parse(raw).map_err(|_| EventError::NotFound)
}

impl EventAction {
    /// # Errors
    ///
    /// `InvalidAction` for an unknown `actionType`, `MissingFields` when a
    /// create/edit lacks `type` or `itemId`, `ItemNotFound` for an unknown
    /// `type`, `InvalidDate` for an unreadable date, and `MissingEventId`
    /// when an edit or delete has no event id.
    pub fn parse(&self) -> Result<EventCommand, EventError> {
        let action = self.action_type.as_deref().map(str::trim).unwrap_or_default();

        match action {
            "toggleAddEvent" => Ok(EventCommand::Toggle(SettingFlag::AddEventEnabled, self.enabled)),
            "togglePurchaseEvent" => Ok(EventCommand::Toggle(
                SettingFlag::OnlyPurchasedItem,
                self.enabled,
            )),
            "toggleUploads" => Ok(EventCommand::Toggle(SettingFlag::UploadsEnabled, self.enabled)),
            "toggleFetchVariant" => Ok(EventCommand::Toggle(
                SettingFlag::FetchVariantEnabled,
                self.enabled,
            )),
            "createEvent" => self.draft().map(EventCommand::Create),
            "editEvent" => {
                let draft = self.draft()?;
                let id = parse_event_id(self.event_id.as_ref())?;
                Ok(EventCommand::Edit(id, draft))
            }
            "deleteEvent" => parse_event_id(self.event_id.as_ref()).map(EventCommand::Delete),
            _ => Err(EventError::InvalidAction),
        }
    }

    fn draft(&self) -> Result<EventDraft, EventError> {
        let kind = self.kind.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let item_id = self.item_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let (Some(kind), Some(item_id)) = (kind, item_id) else {
            return Err(EventError::MissingFields);
        };

        let kind: ContentType = kind
            .parse()
            .map_err(|_| EventError::ItemNotFound(item_id.to_string()))?;

        Ok(EventDraft {
            kind,
            item_id: item_id.to_string(),
            date: parse_event_date(self.date.as_deref())?,
        })
    }
}

/// Look up the item title and build the stored event. A blog selection names
/// an article, which is what gets stored.
///
/// # Errors
///
/// `ItemNotFound` when the catalog has no such item.
pub async fn event_input(
    catalog: &dyn CatalogLookup,
    draft: &EventDraft,
) -> Result<EventInput, EventError> {
    let kind = match draft.kind {
        ContentType::Blog => ContentType::Article,
        other => other,
    };

    let name = catalog
        .item_title(kind, &draft.item_id)
        .await?
        .ok_or_else(|| EventError::ItemNotFound(draft.item_id.clone()))?;

    Ok(EventInput {
        name,
        kind,
        shopify_id: draft.item_id.clone(),
        date: draft.date,
    })
}

/// Apply an event command for a shop.
///
/// # Errors
///
/// `EventsDisabled` when creating or editing while event mode is off,
/// `NotFound` when the event does not belong to the shop, plus catalog and
/// repository failures.
#[tracing::instrument(skip(pool, catalog), fields(shop = %shop))]
pub async fn apply(
    pool: &PgPool,
    shop: &ShopDomain,
    catalog: &dyn CatalogLookup,
    command: EventCommand,
) -> Result<(), EventError> {
    let events = EventRepository::new(pool);

    match command {
        EventCommand::Toggle(flag, enabled) => {
            SettingRepository::new(pool)
                .set_flag(shop, flag, enabled)
                .await?;
        }
        EventCommand::Delete(id) => {
            if !events.delete(shop, id).await? {
                return Err(EventError::NotFound);
            }
            tracing::info!(event_id = %id, "Event deleted");
        }
        EventCommand::Create(draft) => {
            ensure_events_enabled(pool, shop).await?;
            let input = event_input(catalog, &draft).await?;
            events.create(shop, &input).await?;
        }
        EventCommand::Edit(id, draft) => {
            ensure_events_enabled(pool, shop).await?;
            let input = event_input(catalog, &draft).await?;
            events.update(shop, id, &input).await?;
            tracing::info!(event_id = %id, "Event updated");
        }
    }

    Ok(())
}

async fn ensure_events_enabled(pool: &PgPool, shop: &ShopDomain) -> Result<(), EventError> {
    let setting = SettingRepository::new(pool).get_or_create(shop).await?;
    if setting.add_event_enabled {
        Ok(())
    } else {
        Err(EventError::EventsDisabled)
    }
}
