//! Upload intake: validate a storefront submission, decide what it is
//! attached to, push the files to image storage and persist the result.
//!
//! # Flow
//!
//! 1. [`IntakeForm::validate`] rejects missing fields, a malformed email, no
//!    files, too many files and oversized files, before anything is written.
//! 2. The shop's setting is loaded (created with defaults if absent). Uploads
//!    may be switched off per shop.
//! 3. [`plan_linkage`] classifies the target under the shop's mode.
//! 4. Item targets get a display name from the catalog and, for products in
//!    shops that require it, a purchase check.
//! 5. Every file is transferred to storage. If one fails, the files already
//!    stored are deleted again and nothing is written.
//! 6. The upload and all image rows are inserted in one transaction. If that
//!    fails, the stored files are deleted again.
//!
//! The result is all-or-nothing: either the upload exists with every image,
//! or no row exists at all.

use chrono::{DateTime, Utc};
use gallery_flow_core::{
    ContentType, Email, EmailError, EventId, GalleryMode, ShopDomain, TargetRef, UploadId,
};
use sqlx::PgPool;
use thiserror::Error;

use crate::config::UploadLimits;
use crate::db::{
    EventRepository, NewImage, NewUpload, RepositoryError, SettingRepository, UploadLinkage,
    UploadRepository,
};
use crate::models::Event;
use crate::shopify::{CatalogError, CatalogLookup};
use crate::storage::{ImageStorage, StorageError, StoredImage, UploadFile};

/// Acknowledgement returned once a submission is stored.
pub const ACCEPTED_MESSAGE: &str = "Your gallery upload is in process.";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("At least one image is required")]
    MissingFiles,

    #[error("Too many images: at most {max} per upload")]
    TooManyFiles { max: usize },

    #[error("{file_name} exceeds the {max_bytes} byte limit")]
    FileTooLarge { file_name: String, max_bytes: usize },

    #[error("Uploads are disabled for this shop")]
    UploadsDisabled,

    #[error("Uploads for this event are not open")]
    UploadWindowClosed,

    #[error("Only customers who purchased this product can upload")]
    PurchaseRequired,

    #[error("Invalid upload target: {0}")]
    InvalidTarget(String),

    #[error("catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("image storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A submission as read from the multipart body.
#[derive(Debug, Clone, Default)]
pub struct IntakeForm {
    pub customer_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Sent as `eventId` by older theme blocks, `targetId` by newer ones.
    pub target_id: Option<String>,
    pub shop: Option<String>,
    pub files: Vec<UploadFile>,
}

/// A submission that passed validation.
#[derive(Debug, Clone)]
pub struct Submission {
    pub customer_id: String,
    pub name: Option<String>,
    pub email: Email,
    pub target: TargetRef,
    pub files: Vec<UploadFile>,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl IntakeForm {
    /// Check the submission before any side effect.
    ///
    /// # Errors
    ///
    /// In order: `MissingFields`, `InvalidEmail`, `MissingFiles`,
    /// `TooManyFiles`, `FileTooLarge`.
    pub fn validate(self, limits: &UploadLimits) -> Result<Submission, IntakeError> {
        let customer_id = present(self.customer_id.as_ref());
        let email = present(self.email.as_ref());
        let target_id = present(self.target_id.as_ref());

        let mut missing = Vec::new();
        if customer_id.is_none() {
            missing.push("customerId");
        }
        if email.is_none() {
            missing.push("email");
        }
        if target_id.is_none() {
            missing.push("targetId");
        }
        let (Some(customer_id), Some(email), Some(target_id)) = (customer_id, email, target_id)
        else {
            return Err(IntakeError::MissingFields(missing));
        };

        let email = Email::parse(email)?;

        if self.files.is_empty() {
            return Err(IntakeError::MissingFiles);
        }
        if self.files.len() > limits.max_files {
            return Err(IntakeError::TooManyFiles {
                max: limits.max_files,
            });
        }
        if let Some(file) = self
            .files
            .iter()
            .find(|f| f.bytes.len() > limits.max_file_bytes)
        {
            return Err(IntakeError::FileTooLarge {
                file_name: file.file_name.clone(),
                max_bytes: limits.max_file_bytes,
            });
        }

        Ok(Submission {
            customer_id: customer_id.to_string(),
            name: present(self.name.as_ref()).map(str::to_string),
            email,
            target: TargetRef::classify(target_id),
            files: self.files,
        })
    }
}

/// Linkage decided before the item name is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedLinkage {
    Event(EventId),
    Item { kind: ContentType, id: String },
}

/// Decide what a target attaches to under the shop's mode.
///
/// `event` is the event row for an event target, looked up across all shops
/// so that a foreign event can be told apart from an unknown id.
///
/// # Errors
///
/// - Event mode: a non-event or unknown event target is `InvalidTarget`; an
///   event of another shop, undated or dated in the future is
///   `UploadWindowClosed`.
/// - Item mode: an event target is accepted only if it is one of the shop's
///   own events (any date); an unrecognized catalog id is `InvalidTarget`.
pub fn plan_linkage(
    mode: GalleryMode,
    target: &TargetRef,
    event: Option<&Event>,
    shop: &ShopDomain,
    now: DateTime<Utc>,
) -> Result<PlannedLinkage, IntakeError> {
    match (mode, target) {
        (GalleryMode::Event, TargetRef::Event(id)) => {
            let event = event.ok_or_else(|| IntakeError::InvalidTarget(id.to_string()))?;
            if &event.shop != shop || !event.accepts_uploads_at(now) {
                return Err(IntakeError::UploadWindowClosed);
            }
            Ok(PlannedLinkage::Event(*id))
        }
        (GalleryMode::Event, other) => Err(IntakeError::InvalidTarget(describe(other))),
        (GalleryMode::Item, TargetRef::Event(id)) => match event {
            Some(event) if &event.shop == shop => Ok(PlannedLinkage::Event(*id)),
            _ => Err(IntakeError::InvalidTarget(id.to_string())),
        },
        (GalleryMode::Item, TargetRef::Unknown(raw)) => {
            Err(IntakeError::InvalidTarget(raw.clone()))
        }
        (GalleryMode::Item, item) => match (item.content_type(), item.catalog_id()) {
            (Some(kind), Some(id)) => Ok(PlannedLinkage::Item {
                kind,
                id: id.to_string(),
            }),
            _ => Err(IntakeError::InvalidTarget(describe(item))),
        },
    }
}

fn describe(target: &TargetRef) -> String {
    match target {
        TargetRef::Event(id) => id.to_string(),
        TargetRef::Unknown(raw) => raw.clone(),
        other => other.catalog_id().unwrap_or_default().to_string(),
    }
}

/// Name an item target and enforce purchase gating.
///
/// # Errors
///
/// `PurchaseRequired` when the shop only accepts uploads from buyers and the
/// customer never ordered the product; `Catalog` when a lookup fails.
pub async fn describe_item(
    catalog: &dyn CatalogLookup,
    only_purchased_item: bool,
    customer_id: &str,
    kind: ContentType,
    id: &str,
) -> Result<UploadLinkage, IntakeError> {
    if kind == ContentType::Product
        && only_purchased_item
        && !catalog.customer_purchased_product(customer_id, id).await?
    {
        return Err(IntakeError::PurchaseRequired);
    }

    let item_name = catalog
        .item_title(kind, id)
        .await?
        .unwrap_or_else(|| kind.label().to_string());

    Ok(UploadLinkage::Item {
        item_id: id.to_string(),
        item_type: kind,
        item_name,
    })
}

/// Transfer files one by one. On failure the files already stored are
/// deleted again before the error is returned.
///
/// # Errors
///
/// Returns the first `StorageError`.
pub async fn transfer_images(
    storage: &dyn ImageStorage,
    files: &[UploadFile],
) -> Result<Vec<StoredImage>, StorageError> {
    let mut stored = Vec::with_capacity(files.len());

    for file in files {
        match storage.upload(file).await {
            Ok(image) => stored.push(image),
            Err(e) => {
                tracing::error!(
                    file = %file.file_name,
                    transferred = stored.len(),
                    error = %e,
                    "Image transfer failed, discarding stored files"
                );
                discard(storage, &stored).await;
                return Err(e);
            }
        }
    }

    Ok(stored)
}

/// Best-effort deletion of stored files. Failures are logged only.
async fn discard(storage: &dyn ImageStorage, stored: &[StoredImage]) {
    for image in stored {
        if let Err(e) = storage.delete(&image.public_id).await {
            tracing::warn!(public_id = %image.public_id, error = %e, "Failed to delete stored image");
        }
    }
}

/// Collaborators of one intake request.
pub struct IntakeContext<'a> {
    pub pool: &'a PgPool,
    pub storage: &'a dyn ImageStorage,
    pub catalog: &'a dyn CatalogLookup,
    pub shop: &'a ShopDomain,
    pub now: DateTime<Utc>,
}

/// Accept a validated submission.
///
/// # Errors
///
/// Any [`IntakeError`]; no row is written and no file stays stored when an
/// error is returned.
#[tracing::instrument(skip_all, fields(shop = %ctx.shop, files = submission.files.len()))]
pub async fn accept(ctx: &IntakeContext<'_>, submission: Submission) -> Result<UploadId, IntakeError> {
    let setting = SettingRepository::new(ctx.pool)
        .get_or_create(ctx.shop)
        .await?;
    if !setting.uploads_enabled {
        return Err(IntakeError::UploadsDisabled);
    }

    let event = match &submission.target {
        TargetRef::Event(id) => EventRepository::new(ctx.pool).find_any(*id).await?,
        _ => None,
    };

    let planned = plan_linkage(
        setting.mode(),
        &submission.target,
        event.as_ref(),
        ctx.shop,
        ctx.now,
    )?;

    let linkage = match planned {
        PlannedLinkage::Event(id) => UploadLinkage::Event(id),
        PlannedLinkage::Item { kind, id } => {
            describe_item(
                ctx.catalog,
                setting.only_purchased_item,
                &submission.customer_id,
                kind,
                &id,
            )
            .await?
        }
    };

    let stored = transfer_images(ctx.storage, &submission.files).await?;
    let images: Vec<NewImage> = stored
        .iter()
        .map(|s| NewImage {
            url: s.url.clone(),
            public_id: Some(s.public_id.clone()),
            alt_text: None,
        })
        .collect();

    let new = NewUpload {
        shop: ctx.shop.clone(),
        customer_id: submission.customer_id,
        name: submission.name,
        email: submission.email.into_inner(),
        linkage,
    };

    match UploadRepository::new(ctx.pool)
        .create_with_images(&new, &images)
        .await
    {
        Ok(id) => Ok(id),
        Err(e) => {
            tracing::error!(error = %e, "Persisting upload failed, discarding stored files");
            discard(ctx.storage, &stored).await;
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;

    /// In-memory storage that fails on the n-th upload (0-based) if asked to.
    #[derive(Default)]
    pub(crate) struct MemoryStorage {
        pub fail_on: Option<usize>,
        pub uploaded: Mutex<Vec<String>>,
        pub deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageStorage for MemoryStorage {
        async fn upload(&self, file: &UploadFile) -> Result<StoredImage, StorageError> {
            let mut uploaded = self.uploaded.lock().unwrap();
            if self.fail_on == Some(uploaded.len()) {
                return Err(StorageError::Rejected("disk full".to_string()));
            }
            let public_id = format!("mem-{}", file.file_name);
            uploaded.push(public_id.clone());
            Ok(StoredImage {
                url: format!("https://img/{}", file.file_name),
                public_id,
            })
        }

        async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
            self.deleted.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct MemoryCatalog {
        pub titles: HashMap<String, String>,
        pub purchases: Vec<(String, String)>,
    }

    #[async_trait]
    impl CatalogLookup for MemoryCatalog {
        async fn item_title(
            &self,
            _kind: ContentType,
            id: &str,
        ) -> Result<Option<String>, CatalogError> {
            Ok(self.titles.get(id).cloned())
        }

        async fn customer_purchased_product(
            &self,
            customer_id: &str,
            product_id: &str,
        ) -> Result<bool, CatalogError> {
            Ok(self
                .purchases
                .iter()
                .any(|(c, p)| c == customer_id && p == product_id))
        }
    }

    fn file(name: &str, len: usize) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![0; len],
        }
    }

    fn form() -> IntakeForm {
        IntakeForm {
            customer_id: Some("gid://shopify/Customer/1".to_string()),
            name: Some("Jane".to_string()),
            email: Some("jane@example.com".to_string()),
            target_id: Some("gid://shopify/Product/55".to_string()),
            shop: None,
            files: vec![file("a.png", 10)],
        }
    }

    fn shop() -> ShopDomain {
        ShopDomain::parse("demo.myshopify.com").unwrap()
    }

    fn event(shop: ShopDomain, date: Option<DateTime<Utc>>) -> Event {
        Event {
            id: EventId::new(),
            shop,
            name: "Launch".to_string(),
            kind: ContentType::Product,
            shopify_id: "gid://shopify/Product/55".to_string(),
            date,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_reports_all_missing_fields() {
        let mut f = form();
        f.customer_id = None;
        f.target_id = Some("  ".to_string());
        match f.validate(&UploadLimits::default()) {
            Err(IntakeError::MissingFields(fields)) => {
                assert_eq!(fields, vec!["customerId", "targetId"]);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_checks_fields_before_files() {
        let mut f = form();
        f.email = None;
        f.files.clear();
        assert!(matches!(
            f.validate(&UploadLimits::default()),
            Err(IntakeError::MissingFields(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_email() {
        let mut f = form();
        f.email = Some("not-an-email".to_string());
        assert!(matches!(
            f.validate(&UploadLimits::default()),
            Err(IntakeError::InvalidEmail(EmailError::BadAtSymbol))
        ));
    }

    #[test]
    fn test_validate_file_limits() {
        let limits = UploadLimits {
            max_files: 2,
            max_file_bytes: 100,
        };

        let mut f = form();
        f.files.clear();
        assert!(matches!(f.validate(&limits), Err(IntakeError::MissingFiles)));

        let mut f = form();
        f.files = vec![file("a", 1), file("b", 1), file("c", 1)];
        assert!(matches!(
            f.validate(&limits),
            Err(IntakeError::TooManyFiles { max: 2 })
        ));

        let mut f = form();
        f.files = vec![file("small", 1), file("huge.png", 101)];
        match f.validate(&limits) {
            Err(IntakeError::FileTooLarge { file_name, .. }) => assert_eq!(file_name, "huge.png"),
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_classifies_target() {
        let submission = form().validate(&UploadLimits::default()).unwrap();
        assert_eq!(
            submission.target,
            TargetRef::Product("gid://shopify/Product/55".to_string())
        );
        assert_eq!(submission.name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_event_mode_accepts_past_own_event() {
        let now = Utc::now();
        let ev = event(shop(), Some(now - Duration::days(1)));
        let planned = plan_linkage(
            GalleryMode::Event,
            &TargetRef::Event(ev.id),
            Some(&ev),
            &shop(),
            now,
        )
        .unwrap();
        assert_eq!(planned, PlannedLinkage::Event(ev.id));
    }

    #[test]
    fn test_event_mode_rejects_future_undated_and_foreign_events() {
        let now = Utc::now();
        let future = event(shop(), Some(now + Duration::days(1)));
        let undated = event(shop(), None);
        let foreign = event(
            ShopDomain::parse("other.myshopify.com").unwrap(),
            Some(now - Duration::days(1)),
        );

        for ev in [&future, &undated, &foreign] {
            assert!(matches!(
                plan_linkage(
                    GalleryMode::Event,
                    &TargetRef::Event(ev.id),
                    Some(ev),
                    &shop(),
                    now
                ),
                Err(IntakeError::UploadWindowClosed)
            ));
        }
    }

    #[test]
    fn test_event_mode_rejects_non_events() {
        let now = Utc::now();
        assert!(matches!(
            plan_linkage(
                GalleryMode::Event,
                &TargetRef::Event(EventId::new()),
                None,
                &shop(),
                now
            ),
            Err(IntakeError::InvalidTarget(_))
        ));
        assert!(matches!(
            plan_linkage(
                GalleryMode::Event,
                &TargetRef::classify("gid://shopify/Product/55"),
                None,
                &shop(),
                now
            ),
            Err(IntakeError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_item_mode_classification() {
        let now = Utc::now();

        let planned = plan_linkage(
            GalleryMode::Item,
            &TargetRef::classify("gid://shopify/Collection/9"),
            None,
            &shop(),
            now,
        )
        .unwrap();
        assert_eq!(
            planned,
            PlannedLinkage::Item {
                kind: ContentType::Collection,
                id: "gid://shopify/Collection/9".to_string()
            }
        );

        assert!(matches!(
            plan_linkage(
                GalleryMode::Item,
                &TargetRef::classify("gid://shopify/Video/1"),
                None,
                &shop(),
                now
            ),
            Err(IntakeError::InvalidTarget(raw)) if raw == "gid://shopify/Video/1"
        ));

        // Own events stay accepted in item mode regardless of date.
        let future = event(shop(), Some(now + Duration::days(3)));
        assert_eq!(
            plan_linkage(
                GalleryMode::Item,
                &TargetRef::Event(future.id),
                Some(&future),
                &shop(),
                now
            )
            .unwrap(),
            PlannedLinkage::Event(future.id)
        );
    }

    #[tokio::test]
    async fn test_describe_item_uses_title_or_label() {
        let mut catalog = MemoryCatalog::default();
        catalog.titles.insert(
            "gid://shopify/Page/3".to_string(),
            "About us".to_string(),
        );

        let named = describe_item(&catalog, false, "1", ContentType::Page, "gid://shopify/Page/3")
            .await
            .unwrap();
        assert!(matches!(named, UploadLinkage::Item { ref item_name, .. } if item_name == "About us"));

        let fallback = describe_item(&catalog, false, "1", ContentType::Page, "gid://shopify/Page/4")
            .await
            .unwrap();
        assert!(matches!(fallback, UploadLinkage::Item { ref item_name, .. } if item_name == "Page"));
    }

    #[tokio::test]
    async fn test_describe_item_enforces_purchase_gate() {
        let catalog = MemoryCatalog {
            titles: HashMap::new(),
            purchases: vec![("c1".to_string(), "p1".to_string())],
        };

        assert!(matches!(
            describe_item(&catalog, true, "c2", ContentType::Product, "p1").await,
            Err(IntakeError::PurchaseRequired)
        ));
        assert!(describe_item(&catalog, true, "c1", ContentType::Product, "p1")
            .await
            .is_ok());
        // Gate off, or not a product: no check.
        assert!(describe_item(&catalog, false, "c2", ContentType::Product, "p1")
            .await
            .is_ok());
        assert!(describe_item(&catalog, true, "c2", ContentType::Page, "p1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_transfer_discards_stored_files_on_failure() {
        let storage = MemoryStorage {
            fail_on: Some(1),
            ..MemoryStorage::default()
        };
        let files = vec![file("one.png", 1), file("two.png", 1), file("three.png", 1)];

        let result = transfer_images(&storage, &files).await;
        assert!(matches!(result, Err(StorageError::Rejected(_))));
        assert_eq!(*storage.uploaded.lock().unwrap(), vec!["mem-one.png"]);
        assert_eq!(*storage.deleted.lock().unwrap(), vec!["mem-one.png"]);
    }

    #[tokio::test]
    async fn test_transfer_keeps_order() {
        let storage = MemoryStorage::default();
        let files = vec![file("one.png", 1), file("two.png", 1)];

        let stored = transfer_images(&storage, &files).await.unwrap();
        let urls: Vec<&str> = stored.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://img/one.png", "https://img/two.png"]);
        assert!(storage.deleted.lock().unwrap().is_empty());
    }
}
