//! Text, proximity and tag search.

use raving_reviews_catalog::CatalogError;
use raving_reviews_integration_tests::{ORIGIN, TestContext, described_store, store_input};

// ============================================================================
// Text search
// ============================================================================

#[tokio::test]
async fn test_blank_query_returns_nothing() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    ctx.catalog
        .stores()
        .create_store(&described_store("Coffee Corner", "Espresso bar", &[]), user.id)
        .await
        .expect("create");

    let hits = ctx.catalog.search().search_by_text("   ").await.expect("search");

    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_name_match_outranks_description_match() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();
    for (name, description) in [
        ("Tea House", "Coffee also served"),
        ("Coffee Corner", "Espresso bar"),
        ("Book Nook", "Used paperbacks"),
    ] {
        stores
            .create_store(&described_store(name, description, &[]), user.id)
            .await
            .expect("create");
    }

    let hits = ctx.catalog.search().search_by_text("coffee").await.expect("search");

    let names: Vec<&str> = hits.iter().map(|h| h.store.name.as_str()).collect();
    assert_eq!(names, vec!["Coffee Corner", "Tea House"]);
}

#[tokio::test]
async fn test_text_search_caps_results_best_first() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    for i in 0..8 {
        let description = "pizza ".repeat(i + 1);
        ctx.catalog
            .stores()
            .create_store(
                &described_store(&format!("Slice {i}"), description.trim(), &[]),
                user.id,
            )
            .await
            .expect("create");
    }

    let hits = ctx.catalog.search().search_by_text("pizza").await.expect("search");

    assert_eq!(hits.len(), 5);
    assert!(hits.windows(2).all(|w| match w {
        [a, b] => a.score >= b.score,
        _ => true,
    }));
}

#[tokio::test]
async fn test_text_search_matches_word_stems() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    ctx.catalog
        .stores()
        .create_store(&described_store("Roastery", "Freshly roasted coffees", &[]), user.id)
        .await
        .expect("create");

    let hits = ctx.catalog.search().search_by_text("coffee").await.expect("search");

    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_text_search_matches_any_term() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();
    for (name, description) in [
        ("Coffee Corner", "Espresso bar"),
        ("Tires Plus", "Tires and rims"),
        ("Book Nook", "Used paperbacks"),
    ] {
        stores
            .create_store(&described_store(name, description, &[]), user.id)
            .await
            .expect("create");
    }

    let hits = ctx
        .catalog
        .search()
        .search_by_text("coffee tires")
        .await
        .expect("search");

    let mut names: Vec<&str> = hits.iter().map(|h| h.store.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Coffee Corner", "Tires Plus"]);
}

#[tokio::test]
async fn test_text_search_tolerates_stray_syntax() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    ctx.catalog
        .stores()
        .create_store(&described_store("Coffee Corner", "Espresso bar", &[]), user.id)
        .await
        .expect("create");

    let result = ctx.catalog.search().search_by_text("coffee AND (").await;

    assert!(result.is_ok_and(|hits| hits.len() <= 1));
}

#[tokio::test]
async fn test_renamed_store_is_found_by_new_name() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let store = ctx
        .catalog
        .stores()
        .create_store(&described_store("Coffee Corner", "Espresso bar", &[]), user.id)
        .await
        .expect("create");
    ctx.catalog
        .stores()
        .update_store(store.id, &described_store("Bagel Barn", "Bagels", &[]), user.id)
        .await
        .expect("rename");

    let search = ctx.catalog.search();
    assert!(search.search_by_text("coffee").await.expect("search").is_empty());
    assert_eq!(search.search_by_text("bagel").await.expect("search").len(), 1);
}

// ============================================================================
// Proximity
// ============================================================================

#[tokio::test]
async fn test_near_returns_ten_nearest_within_radius() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let (lng, lat) = ORIGIN;

    // Twelve stores spaced roughly 550 m apart heading north, plus one ~22 km away.
    for i in 0..12_u32 {
        let offset = f64::from(i + 1) * 0.005;
        ctx.catalog
            .stores()
            .create_store(&store_input(&format!("North {i}"), lng, lat + offset), user.id)
            .await
            .expect("create");
    }
    ctx.catalog
        .stores()
        .create_store(&store_input("Far Away", lng, lat + 0.2), user.id)
        .await
        .expect("create");

    let hits = ctx
        .catalog
        .search()
        .search_near(Some(&lng.to_string()), Some(&lat.to_string()))
        .await
        .expect("near");

    assert_eq!(hits.len(), 10);
    assert_eq!(hits.first().map(|h| h.name.as_str()), Some("North 0"));
    assert!(hits.iter().all(|h| h.distance_metres <= 10_000.0));
    assert!(hits.iter().all(|h| h.name != "Far Away"));
    assert!(hits.windows(2).all(|w| match w {
        [a, b] => a.distance_metres <= b.distance_metres,
        _ => true,
    }));
}

#[tokio::test]
async fn test_near_with_nothing_close_is_empty() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    ctx.catalog
        .stores()
        .create_store(&store_input("Vancouver", -123.12, 49.28), user.id)
        .await
        .expect("create");

    let hits = ctx
        .catalog
        .search()
        .search_near(Some("-79.3832"), Some("43.6532"))
        .await
        .expect("near");

    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_near_rejects_bad_coordinates() {
    let ctx = TestContext::new();
    let search = ctx.catalog.search();

    for (lng, lat) in [
        (Some("abc"), Some("43.65")),
        (None, Some("43.65")),
        (Some("-79.38"), None),
        (Some("-79.38"), Some("91")),
        (Some("181"), Some("43.65")),
    ] {
        let err = search.search_near(lng, lat).await.expect_err("invalid point");
        assert!(matches!(err, CatalogError::InvalidInput(_)), "{lng:?}, {lat:?}");
    }
}

// ============================================================================
// Tags
// ============================================================================

#[tokio::test]
async fn test_tag_counts_ascend_and_filter() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();
    for (name, tags) in [
        ("Alpha", &["Wifi", "Family Friendly"][..]),
        ("Bravo", &["Wifi"][..]),
        ("Charlie", &[][..]),
    ] {
        stores
            .create_store(&described_store(name, "", tags), user.id)
            .await
            .expect("create");
    }

    let listing = ctx.catalog.search().list_by_tag(Some("Wifi")).await.expect("tags");

    let counts: Vec<(&str, u64)> = listing
        .tags
        .iter()
        .map(|t| (t.tag.as_str(), t.count))
        .collect();
    assert_eq!(counts, vec![("Family Friendly", 1), ("Wifi", 2)]);
    assert_eq!(listing.selected.as_deref(), Some("Wifi"));
    let names: Vec<&str> = listing.stores.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Bravo"]);
}

#[tokio::test]
async fn test_no_tag_lists_every_tagged_store() {
    let ctx = TestContext::new();
    let user = ctx.register("wes@example.com").await;
    let stores = ctx.catalog.stores();
    for (name, tags) in [("Alpha", &["Licensed"][..]), ("Bravo", &[][..])] {
        stores
            .create_store(&described_store(name, "", tags), user.id)
            .await
            .expect("create");
    }

    let listing = ctx.catalog.search().list_by_tag(Some("  ")).await.expect("tags");

    assert!(listing.selected.is_none());
    let names: Vec<&str> = listing.stores.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha"]);
}
