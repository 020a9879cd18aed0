//! Slug generation through store creation and renames.
//!
//! Runs against the in-memory catalog; no services needed.

use std::sync::Arc;

use raving_reviews_catalog::ports::StoreRepository;
use raving_reviews_catalog::{CatalogError, CatalogSettings};
use raving_reviews_integration_tests::{StaleSlugReads, TestContext, settings, store_input};

const LNG: f64 = -79.38;
const LAT: f64 = 43.65;

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_same_name_gets_numbered_slugs() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;

    let mut slugs = Vec::new();
    for _ in 0..3 {
        let store = ctx
            .catalog
            .stores()
            .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
            .await
            .expect("Failed to create store");
        slugs.push(store.slug.to_string());
    }

    assert_eq!(slugs, vec!["cafe-rio", "cafe-rio-2", "cafe-rio-3"]);
}

#[tokio::test]
async fn test_generate_slug_previews_next_free_slug() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;

    let slug = ctx.catalog.slugs().generate_slug("Café & Bar").await.expect("slug");
    assert_eq!(slug.as_str(), "cafe-and-bar");

    ctx.catalog
        .stores()
        .create_store(&store_input("Café & Bar", LNG, LAT), user.id)
        .await
        .expect("Failed to create store");

    let slug = ctx.catalog.slugs().generate_slug("Cafe and Bar").await.expect("slug");
    assert_eq!(slug.as_str(), "cafe-and-bar-2");
}

#[tokio::test]
async fn test_longer_names_do_not_join_the_family() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();

    stores
        .create_store(&store_input("Cafe Rio Grande", LNG, LAT), user.id)
        .await
        .expect("Failed to create store");
    let store = stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("Failed to create store");

    assert_eq!(store.slug.as_str(), "cafe-rio");
}

#[tokio::test]
async fn test_name_without_alphanumerics_is_rejected() {
    let ctx = TestContext::new();

    let err = ctx.catalog.slugs().generate_slug("!!!").await.expect_err("no slug");
    assert!(matches!(err, CatalogError::Validation(_)));
}

// ============================================================================
// Renames
// ============================================================================

#[tokio::test]
async fn test_edit_without_rename_keeps_slug() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();

    stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("create");
    let second = stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("create");
    assert_eq!(second.slug.as_str(), "cafe-rio-2");

    let mut input = store_input("Cafe Rio", LNG, LAT);
    input.description = Some("Now with churros".to_owned());
    let updated = stores
        .update_store(second.id, &input, user.id)
        .await
        .expect("update");

    assert_eq!(updated.slug.as_str(), "cafe-rio-2");
    assert_eq!(updated.description.as_deref(), Some("Now with churros"));
}

#[tokio::test]
async fn test_rename_regenerates_slug_within_new_family() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();

    stores
        .create_store(&store_input("Taco Town", LNG, LAT), user.id)
        .await
        .expect("create");
    let store = stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("create");

    let renamed = stores
        .update_store(store.id, &store_input("Taco Town", LNG, LAT), user.id)
        .await
        .expect("rename");
    assert_eq!(renamed.slug.as_str(), "taco-town-2");

    // The old slug is free again.
    assert!(ctx.catalog.stores().get_store_by_slug("cafe-rio").await.is_err());
}

#[tokio::test]
async fn test_rename_back_does_not_count_itself() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();

    let store = stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("create");
    stores
        .update_store(store.id, &store_input("Cafe Rio Grande", LNG, LAT), user.id)
        .await
        .expect("rename");
    let back = stores
        .update_store(store.id, &store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("rename back");

    assert_eq!(back.slug.as_str(), "cafe-rio");
}

// ============================================================================
// Conflicts
// ============================================================================

fn stale_context(settings: CatalogSettings) -> (TestContext, Arc<StaleSlugReads>) {
    let mut wrapper = None;
    let ctx = TestContext::with_store_repository(settings, |backend| {
        let stale = Arc::new(StaleSlugReads::new(backend, 0));
        wrapper = Some(stale.clone());
        stale as Arc<dyn StoreRepository>
    });
    (ctx, wrapper.expect("wrapper installed"))
}

#[tokio::test]
async fn test_conflict_after_stale_read_regenerates() {
    let (ctx, stale) = stale_context(settings());
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();
    stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("first create");

    // The next lookup misses "cafe-rio", so the insert collides and is retried.
    stale.go_stale(1);
    let store = stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("create after conflict");

    assert_eq!(store.slug.as_str(), "cafe-rio-2");
    assert_eq!(stale.family_reads(), 3);
}

#[tokio::test]
async fn test_conflict_exhausts_retry_limit() {
    let mut settings = settings();
    settings.slug_retry_limit = 3;
    let (ctx, stale) = stale_context(settings);
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();
    stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect("first create");

    stale.go_stale(usize::MAX);
    let err = stores
        .create_store(&store_input("Cafe Rio", LNG, LAT), user.id)
        .await
        .expect_err("every attempt collides");

    assert!(matches!(err, CatalogError::Conflict(_)));
    assert!(err.is_retryable());
    assert_eq!(stale.family_reads(), 4);
    assert_eq!(ctx.catalog.stores().list_stores(1).await.expect("list").count, 1);
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_slugs() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let input = store_input("Cafe Rio", LNG, LAT);
    let stores = ctx.catalog.stores();

    let (a, b, c, d) = tokio::join!(
        stores.create_store(&input, user.id),
        stores.create_store(&input, user.id),
        stores.create_store(&input, user.id),
        stores.create_store(&input, user.id),
    );

    let mut slugs: Vec<String> = [a, b, c, d]
        .into_iter()
        .map(|r| r.expect("create").slug.to_string())
        .collect();
    slugs.sort();
    assert_eq!(slugs, vec!["cafe-rio", "cafe-rio-2", "cafe-rio-3", "cafe-rio-4"]);
}
