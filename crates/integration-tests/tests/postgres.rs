//! Catalog operations against `PostgreSQL` + PostGIS.
//!
//! These tests require:
//! - A running `PostgreSQL` database with the PostGIS extension available
//! - `CATALOG_DATABASE_URL` pointing at it (migrations are applied here)
//!
//! Run with: cargo test -p raving-reviews-integration-tests -- --ignored

use chrono::Utc;
use secrecy::SecretString;

use raving_reviews_catalog::models::NewReview;
use raving_reviews_catalog::{Catalog, CatalogError, db};
use raving_reviews_core::Rating;
use raving_reviews_integration_tests::{PASSWORD, described_store, settings, store_input};

async fn catalog() -> Catalog {
    let url = std::env::var("CATALOG_DATABASE_URL").expect("CATALOG_DATABASE_URL not set");
    let pool = db::create_pool(&SecretString::from(url), 5)
        .await
        .expect("Failed to connect to database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    Catalog::postgres(pool, settings())
}

/// A token unique to this test run, so repeated runs do not collide.
fn unique(prefix: &str) -> String {
    format!("{prefix}{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_slug_family_and_search() {
    let catalog = catalog().await;
    let email = format!("{}@example.com", unique("wes"));
    let user = catalog
        .accounts()
        .register(&email, "Wes", PASSWORD, PASSWORD)
        .await
        .expect("register");

    let name = unique("Cafe ");
    let first = catalog
        .stores()
        .create_store(&described_store(&name, "Burritos and horchata", &["Wifi"]), user.id)
        .await
        .expect("create");
    let second = catalog
        .stores()
        .create_store(&described_store(&name, "Second location", &[]), user.id)
        .await
        .expect("create");
    assert_eq!(second.slug.to_string(), format!("{}-2", first.slug));

    let hits = catalog
        .search()
        .search_by_text(&name)
        .await
        .expect("search");
    assert!(hits.iter().any(|h| h.store.id == first.id));

    let detail = catalog
        .stores()
        .get_store_by_slug(first.slug.as_str())
        .await
        .expect("detail");
    assert_eq!(detail.author.map(|a| a.id), Some(user.id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_text_search_matches_any_term() {
    let catalog = catalog().await;
    let email = format!("{}@example.com", unique("any"));
    let user = catalog
        .accounts()
        .register(&email, "Any", PASSWORD, PASSWORD)
        .await
        .expect("register");

    // Made-up words keep other runs' stores out of the result.
    let first = unique("zorblax");
    let second = unique("quindle");
    let a = catalog
        .stores()
        .create_store(&described_store(&first, "Espresso bar", &[]), user.id)
        .await
        .expect("create");
    let b = catalog
        .stores()
        .create_store(&described_store(&second, "Tires and rims", &[]), user.id)
        .await
        .expect("create");

    let hits = catalog
        .search()
        .search_by_text(&format!("{first} {second}"))
        .await
        .expect("search");

    assert!(hits.iter().any(|h| h.store.id == a.id));
    assert!(hits.iter().any(|h| h.store.id == b.id));

    // Stop words alone match nothing rather than erroring.
    let none = catalog
        .search()
        .search_by_text("the and of")
        .await
        .expect("search");
    assert!(none.is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_near_uses_geography_distance() {
    let catalog = catalog().await;
    let email = format!("{}@example.com", unique("geo"));
    let user = catalog
        .accounts()
        .register(&email, "Geo", PASSWORD, PASSWORD)
        .await
        .expect("register");

    // A point in the South Atlantic that no other test uses.
    let store = catalog
        .stores()
        .create_store(&store_input(&unique("Buoy "), -20.0, -40.0), user.id)
        .await
        .expect("create");

    let hits = catalog
        .search()
        .search_near(Some("-20.01"), Some("-40.0"))
        .await
        .expect("near");

    let hit = hits.iter().find(|h| h.slug == store.slug).expect("store is near");
    assert!(hit.distance_metres > 500.0 && hit.distance_metres < 1_500.0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_favorites_and_unknown_reset_token() {
    let catalog = catalog().await;
    let email = format!("{}@example.com", unique("reset"));
    let user = catalog
        .accounts()
        .register(&email, "Reset", PASSWORD, PASSWORD)
        .await
        .expect("register");
    let favorites = catalog.favorites();
    let store = catalog
        .stores()
        .create_store(&store_input(&unique("Heart "), 0.0, 0.0), user.id)
        .await
        .expect("create");

    let toggled = favorites.toggle_favorite(user.id, store.id).await.expect("toggle");
    assert!(toggled.hearted);

    catalog
        .password_reset()
        .request_password_reset(&email)
        .await
        .expect("request");

    // The log-only mailer keeps the token to itself, so an unknown token
    // must still be rejected.
    let err = catalog
        .password_reset()
        .consume_reset_token("0000", "new password!", "new password!")
        .await
        .expect_err("unknown token");
    assert!(matches!(err, CatalogError::InvalidOrExpired));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_top_stores_aggregate_in_database() {
    let catalog = catalog().await;
    let email = format!("{}@example.com", unique("top"));
    let user = catalog
        .accounts()
        .register(&email, "Top", PASSWORD, PASSWORD)
        .await
        .expect("register");
    let store = catalog
        .stores()
        .create_store(&store_input(&unique("Ranked "), 10.0, 10.0), user.id)
        .await
        .expect("create");
    for rating in [2, 3] {
        catalog
            .ratings()
            .add_review(&NewReview {
                store: store.id,
                author: user.id,
                rating: Rating::new(rating).expect("rating in range"),
                text: String::new(),
            })
            .await
            .expect("review");
    }

    let top = catalog.ratings().top_stores().await.expect("top");

    assert!(top.len() <= 10);
    assert!(top.iter().all(|r| r.reviews.len() >= 2));
    assert!(top.windows(2).all(|w| match w {
        [a, b] => a.average_rating >= b.average_rating,
        _ => true,
    }));
}
