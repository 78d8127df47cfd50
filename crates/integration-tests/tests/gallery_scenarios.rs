//! End-to-end gallery scenarios against a real database.
//!
//! Each test gets a fresh database with the app migrations applied. Run with
//! `DATABASE_URL` set and `-- --ignored`.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use gallery_flow_app::app;
use gallery_flow_app::db::{
    EventInput, EventRepository, SettingFlag, SettingRepository, UploadRepository,
};
use gallery_flow_app::models::Event;
use gallery_flow_app::services::gallery::{self, GalleryQuery};
use gallery_flow_app::services::intake::{self, IntakeContext, IntakeError, IntakeForm};
use gallery_flow_app::services::moderation::{self, ModerationCommand, ModerationError};
use gallery_flow_core::{ContentType, ModerationStatus, ShopDomain, UploadId};
use gallery_flow_integration_tests::{
    MemoryCatalog, MemoryStorage, SHOP, image_file, other_shop, session_token, shop,
    state_with_pool, test_config,
};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

const PRODUCT: &str = "gid://shopify/Product/55";
const CUSTOMER: &str = "gid://shopify/Customer/7";

fn form(target: &str, files: usize) -> IntakeForm {
    IntakeForm {
        customer_id: Some(CUSTOMER.to_string()),
        name: Some("Ada".to_string()),
        email: Some("ada@example.com".to_string()),
        target_id: Some(target.to_string()),
        shop: None,
        files: (0..files).map(|i| image_file(&format!("{i}.png"))).collect(),
    }
}

async fn submit(
    pool: &PgPool,
    shop: &ShopDomain,
    storage: &MemoryStorage,
    catalog: &MemoryCatalog,
    form: IntakeForm,
) -> Result<UploadId, IntakeError> {
    let submission = form.validate(&test_config().uploads)?;
    let ctx = IntakeContext {
        pool,
        storage,
        catalog,
        shop,
        now: Utc::now(),
    };
    intake::accept(&ctx, submission).await
}

async fn item_mode(pool: &PgPool, shop: &ShopDomain) {
    SettingRepository::new(pool)
        .set_flag(shop, SettingFlag::AddEventEnabled, false)
        .await
        .unwrap();
}

async fn event(pool: &PgPool, shop: &ShopDomain, shopify_id: &str, days_from_now: i64) -> Event {
    EventRepository::new(pool)
        .create(
            shop,
            &EventInput {
                name: "Launch party".to_string(),
                kind: ContentType::Product,
                shopify_id: shopify_id.to_string(),
                date: Some(Utc::now() + Duration::days(days_from_now)),
            },
        )
        .await
        .unwrap()
}

async fn image_ids(pool: &PgPool, upload: UploadId) -> Vec<gallery_flow_core::ImageId> {
    sqlx::query_scalar("SELECT id FROM gallery.image WHERE gallery_id = $1 ORDER BY url")
        .bind(upload)
        .fetch_all(pool)
        .await
        .unwrap()
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM gallery.{table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn approve_all(pool: &PgPool, shop: &ShopDomain, upload: UploadId) {
    moderation::apply(
        pool,
        shop,
        ModerationCommand::SetUploadStatus(upload, ModerationStatus::Approved),
    )
    .await
    .unwrap();
    for id in image_ids(pool, upload).await {
        moderation::apply(
            pool,
            shop,
            ModerationCommand::SetImageStatus(id, ModerationStatus::Approved),
        )
        .await
        .unwrap();
    }
}

async fn show(
    pool: &PgPool,
    shop: &ShopDomain,
    content_id: &str,
    content_type: &str,
) -> gallery::GalleryResolution {
    let request = GalleryQuery {
        content_id: Some(content_id.to_string()),
        content_type: Some(content_type.to_string()),
        shop: None,
    }
    .parse()
    .unwrap();
    gallery::resolve(pool, shop, &request).await.unwrap()
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_item_upload_is_hidden_until_upload_and_images_are_approved(pool: PgPool) {
    let shop = shop();
    item_mode(&pool, &shop).await;
    let storage = MemoryStorage::default();
    let catalog = MemoryCatalog::default().with_title(PRODUCT, "Blue Mug");

    let upload = submit(&pool, &shop, &storage, &catalog, form(PRODUCT, 2))
        .await
        .unwrap();

    let details = UploadRepository::new(&pool).list_for_shop(&shop).await.unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].upload.status, ModerationStatus::Pending);
    assert_eq!(details[0].upload.item_name.as_deref(), Some("Blue Mug"));
    assert_eq!(details[0].images.len(), 2);
    assert!(!show(&pool, &shop, "55", "product").await.is_approved());

    // Upload approved, images still pending
    moderation::apply(
        &pool,
        &shop,
        ModerationCommand::SetUploadStatus(upload, ModerationStatus::Approved),
    )
    .await
    .unwrap();
    assert!(!show(&pool, &shop, "55", "product").await.is_approved());

    let images = image_ids(&pool, upload).await;
    moderation::apply(
        &pool,
        &shop,
        ModerationCommand::SetImageStatus(images[0], ModerationStatus::Approved),
    )
    .await
    .unwrap();

    let resolution = show(&pool, &shop, PRODUCT, "product").await;
    assert!(resolution.is_approved());
    assert_eq!(resolution.images().len(), 1);
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_unknown_item_title_falls_back_to_kind_label(pool: PgPool) {
    let shop = shop();
    item_mode(&pool, &shop).await;

    submit(
        &pool,
        &shop,
        &MemoryStorage::default(),
        &MemoryCatalog::default(),
        form("gid://shopify/Collection/9", 1),
    )
    .await
    .unwrap();

    let details = UploadRepository::new(&pool).list_for_shop(&shop).await.unwrap();
    assert_eq!(details[0].upload.item_type, Some(ContentType::Collection));
    assert_eq!(details[0].upload.item_name.as_deref(), Some("Collection"));
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_purchase_gate_blocks_customers_without_an_order(pool: PgPool) {
    let shop = shop();
    item_mode(&pool, &shop).await;
    SettingRepository::new(&pool)
        .set_flag(&shop, SettingFlag::OnlyPurchasedItem, true)
        .await
        .unwrap();
    let storage = MemoryStorage::default();

    let err = submit(&pool, &shop, &storage, &MemoryCatalog::default(), form(PRODUCT, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::PurchaseRequired));
    assert!(storage.uploaded().is_empty());

    let buyer = MemoryCatalog {
        purchases: vec![(CUSTOMER.to_string(), PRODUCT.to_string())],
        ..MemoryCatalog::default()
    };
    submit(&pool, &shop, &storage, &buyer, form(PRODUCT, 1))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_event_upload_accepted_once_event_has_passed(pool: PgPool) {
    let shop = shop();
    let past = event(&pool, &shop, PRODUCT, -1).await;

    let upload = submit(
        &pool,
        &shop,
        &MemoryStorage::default(),
        &MemoryCatalog::default(),
        form(&past.id.to_string(), 1),
    )
    .await
    .unwrap();
    approve_all(&pool, &shop, upload).await;

    let resolution = show(&pool, &shop, "55", "product").await;
    assert!(resolution.is_approved());
    assert_eq!(resolution.images().len(), 1);
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_mode_switch_changes_visible_images_without_touching_uploads(pool: PgPool) {
    let shop = shop();
    let storage = MemoryStorage::default();
    let catalog = MemoryCatalog::default();
    let settings = SettingRepository::new(&pool);
    let past = event(&pool, &shop, PRODUCT, -1).await;

    let mut event_form = form(&past.id.to_string(), 0);
    event_form.files = vec![image_file("event.png")];
    let event_upload = submit(&pool, &shop, &storage, &catalog, event_form)
        .await
        .unwrap();
    approve_all(&pool, &shop, event_upload).await;

    item_mode(&pool, &shop).await;
    let mut item_form = form(PRODUCT, 0);
    item_form.files = vec![image_file("item.png")];
    let item_upload = submit(&pool, &shop, &storage, &catalog, item_form)
        .await
        .unwrap();
    approve_all(&pool, &shop, item_upload).await;

    settings
        .set_flag(&shop, SettingFlag::AddEventEnabled, true)
        .await
        .unwrap();
    let rows_before =
        serde_json::to_value(UploadRepository::new(&pool).list_for_shop(&shop).await.unwrap())
            .unwrap();

    let urls = |resolution: &gallery::GalleryResolution| -> Vec<String> {
        resolution.images().iter().map(|i| i.url.clone()).collect()
    };

    let event_view = show(&pool, &shop, "55", "product").await;
    assert_eq!(
        urls(&event_view),
        ["https://res.cloudinary.com/demo/gallery/event.png"]
    );

    settings
        .set_flag(&shop, SettingFlag::AddEventEnabled, false)
        .await
        .unwrap();

    let item_view = show(&pool, &shop, "55", "product").await;
    assert_eq!(
        urls(&item_view),
        ["https://res.cloudinary.com/demo/gallery/item.png"]
    );

    let rows_after =
        serde_json::to_value(UploadRepository::new(&pool).list_for_shop(&shop).await.unwrap())
            .unwrap();
    assert_eq!(rows_before, rows_after);
    assert_eq!(count(&pool, "gallery_upload").await, 2);
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_event_upload_rejected_for_future_or_foreign_event(pool: PgPool) {
    let shop = shop();
    let future = event(&pool, &shop, PRODUCT, 3).await;
    let foreign = event(&pool, &other_shop(), PRODUCT, -3).await;

    for target in [future.id, foreign.id] {
        let err = submit(
            &pool,
            &shop,
            &MemoryStorage::default(),
            &MemoryCatalog::default(),
            form(&target.to_string(), 1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IntakeError::UploadWindowClosed), "{target}");
    }
    assert_eq!(count(&pool, "gallery_upload").await, 0);
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_event_mode_rejects_catalog_targets(pool: PgPool) {
    let err = submit(
        &pool,
        &shop(),
        &MemoryStorage::default(),
        &MemoryCatalog::default(),
        form(PRODUCT, 1),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, IntakeError::InvalidTarget(_)));
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_disabled_uploads_store_nothing(pool: PgPool) {
    let shop = shop();
    SettingRepository::new(&pool)
        .set_flag(&shop, SettingFlag::UploadsEnabled, false)
        .await
        .unwrap();
    let storage = MemoryStorage::default();

    let err = submit(&pool, &shop, &storage, &MemoryCatalog::default(), form(PRODUCT, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::UploadsDisabled));
    assert!(storage.uploaded().is_empty());
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_storage_failure_leaves_no_rows_and_no_files(pool: PgPool) {
    let shop = shop();
    item_mode(&pool, &shop).await;
    let storage = MemoryStorage::failing_on(1);

    let err = submit(&pool, &shop, &storage, &MemoryCatalog::default(), form(PRODUCT, 3))
        .await
        .unwrap_err();

    assert!(matches!(err, IntakeError::Storage(_)));
    assert_eq!(count(&pool, "gallery_upload").await, 0);
    assert_eq!(count(&pool, "image").await, 0);
    // The first file made it to storage before the second failed.
    assert_eq!(storage.uploaded(), ["gallery/0.png"]);
    assert_eq!(storage.deleted(), storage.uploaded());
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_moderation_is_idempotent_and_shop_scoped(pool: PgPool) {
    let shop = shop();
    item_mode(&pool, &shop).await;
    let upload = submit(
        &pool,
        &shop,
        &MemoryStorage::default(),
        &MemoryCatalog::default(),
        form(PRODUCT, 1),
    )
    .await
    .unwrap();

    for status in [
        ModerationStatus::Approved,
        ModerationStatus::Approved,
        ModerationStatus::Declined,
        ModerationStatus::Approved,
    ] {
        moderation::apply(&pool, &shop, ModerationCommand::SetUploadStatus(upload, status))
            .await
            .unwrap();
    }

    let err = moderation::apply(
        &pool,
        &other_shop(),
        ModerationCommand::SetUploadStatus(upload, ModerationStatus::Declined),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ModerationError::NotFound));

    let err = moderation::apply(&pool, &other_shop(), ModerationCommand::DeleteUpload(upload))
        .await
        .unwrap_err();
    assert!(matches!(err, ModerationError::NotFound));

    let details = UploadRepository::new(&pool).list_for_shop(&shop).await.unwrap();
    assert_eq!(details[0].upload.status, ModerationStatus::Approved);
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_deleting_upload_removes_its_images(pool: PgPool) {
    let shop = shop();
    item_mode(&pool, &shop).await;
    let upload = submit(
        &pool,
        &shop,
        &MemoryStorage::default(),
        &MemoryCatalog::default(),
        form(PRODUCT, 3),
    )
    .await
    .unwrap();
    assert_eq!(count(&pool, "image").await, 3);

    moderation::apply(&pool, &shop, ModerationCommand::DeleteUpload(upload))
        .await
        .unwrap();

    assert_eq!(count(&pool, "gallery_upload").await, 0);
    assert_eq!(count(&pool, "image").await, 0);
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_delete_by_email_is_limited_to_one_shop(pool: PgPool) {
    let storage = MemoryStorage::default();
    let catalog = MemoryCatalog::default();
    for shop in [shop(), other_shop()] {
        item_mode(&pool, &shop).await;
        submit(&pool, &shop, &storage, &catalog, form(PRODUCT, 1))
            .await
            .unwrap();
    }

    let removed = UploadRepository::new(&pool)
        .delete_by_email(&shop(), "ada@example.com")
        .await
        .unwrap();

    assert_eq!(removed, 1);
    assert_eq!(count(&pool, "gallery_upload").await, 1);
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_gallery_show_infers_shop_and_serves_approved_images(pool: PgPool) {
    let shop = shop();
    item_mode(&pool, &shop).await;
    let upload = submit(
        &pool,
        &shop,
        &MemoryStorage::default(),
        &MemoryCatalog::default(),
        form(PRODUCT, 1),
    )
    .await
    .unwrap();
    approve_all(&pool, &shop, upload).await;

    let state = state_with_pool(pool, Arc::new(MemoryStorage::default()));
    let response = app(state)
        .oneshot(
            Request::get("/api/gallery-show?contentId=55&contentType=product")
                .header(header::ORIGIN, "https://demo.myshopify.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["approved"], true);
    assert_eq!(
        body["images"][0]["url"],
        "https://res.cloudinary.com/demo/gallery/0.png"
    );
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_gallery_show_reports_empty_gallery_with_debug(pool: PgPool) {
    let shop = shop();
    SettingRepository::new(&pool).get_or_create(&shop).await.unwrap();

    let resolution = show(&pool, &shop, "55", "product").await;
    let body = serde_json::to_value(&resolution).unwrap();

    assert_eq!(body["approved"], false);
    assert_eq!(body["message"], gallery::EMPTY_MESSAGE);
    assert_eq!(body["debug"]["addEventEnabled"], true);
}

#[sqlx::test(migrations = "../app/migrations")]
#[ignore = "Requires a PostgreSQL DATABASE_URL"]
async fn test_dashboard_counts_for_session_shop(pool: PgPool) {
    let shop = shop();
    item_mode(&pool, &shop).await;
    let upload = submit(
        &pool,
        &shop,
        &MemoryStorage::default(),
        &MemoryCatalog::default(),
        form(PRODUCT, 2),
    )
    .await
    .unwrap();
    approve_all(&pool, &shop, upload).await;

    let state = state_with_pool(pool, Arc::new(MemoryStorage::default()));
    let response = app(state)
        .oneshot(
            Request::get("/app/dashboard")
                .header(header::AUTHORIZATION, format!("Bearer {}", session_token(SHOP)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["stats"]["customers"], 1);
    assert_eq!(body["stats"]["approvedImages"], 2);
    assert_eq!(body["mode"], "item");
}
