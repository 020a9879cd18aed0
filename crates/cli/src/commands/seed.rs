//! Seed the catalog with users, stores and reviews from a JSON file.
//!
//! # File Format
//!
//! ```json
//! {
//!   "users": [{ "email": "wes@example.com", "name": "Wes", "password": "hunter22" }],
//!   "stores": [{
//!     "author": "wes@example.com",
//!     "name": "Cafe Rio",
//!     "tags": ["Wifi"],
//!     "address": "1 Main St",
//!     "lng": -79.38,
//!     "lat": 43.65
//!   }],
//!   "reviews": [{ "store": "cafe-rio", "author": "wes@example.com", "rating": 5, "text": "Great" }]
//! }
//! ```
//!
//! Stores reference their author by email; reviews reference their store by
//! the slug it was given while seeding.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use raving_reviews_catalog::models::{NewReview, StoreInput};
use raving_reviews_catalog::{Catalog, CatalogConfig, db};
use raving_reviews_core::{Rating, StoreId, UserId};

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub stores: Vec<SeedStore>,
    #[serde(default)]
    pub reviews: Vec<SeedReview>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedStore {
    /// Email of a user in the same file
    pub author: String,
    #[serde(flatten)]
    pub input: StoreInput,
}

#[derive(Debug, Deserialize)]
pub struct SeedReview {
    /// Slug assigned to a store in the same file
    pub store: String,
    /// Email of a user in the same file
    pub author: String,
    pub rating: Rating,
    pub text: String,
}

/// What a seeding pass created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub stores: usize,
    pub reviews: usize,
}

/// Seed the `PostgreSQL` catalog from a file.
///
/// # Errors
///
/// Returns an error if configuration is missing, the file cannot be read or
/// parsed, or any record is rejected by the catalog.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let seed = read(path).await?;

    let config = CatalogConfig::from_env()?;
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;
    let catalog = Catalog::postgres(pool, config.settings);

    let report = load(&catalog, &seed).await?;
    info!(
        users = report.users,
        stores = report.stores,
        reviews = report.reviews,
        "Seeding complete"
    );
    Ok(())
}

/// Read and parse a seed file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid seed JSON.
pub async fn read(path: &Path) -> Result<SeedFile, Box<dyn std::error::Error>> {
    info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Insert every record of `seed` through the catalog services.
///
/// # Errors
///
/// Returns an error naming the first record that fails.
pub async fn load(
    catalog: &Catalog,
    seed: &SeedFile,
) -> Result<SeedReport, Box<dyn std::error::Error>> {
    let mut users: HashMap<String, UserId> = HashMap::new();
    for user in &seed.users {
        let created = catalog
            .accounts()
            .register(&user.email, &user.name, &user.password, &user.password)
            .await
            .map_err(|e| format!("user {}: {e}", user.email))?;
        users.insert(created.email.to_string(), created.id);
    }

    let author_of = |email: &str| -> Result<UserId, String> {
        users
            .get(&email.trim().to_lowercase())
            .copied()
            .ok_or_else(|| format!("unknown author {email}"))
    };

    let mut stores: HashMap<String, StoreId> = HashMap::new();
    for store in &seed.stores {
        let author = author_of(&store.author)?;
        let created = catalog
            .stores()
            .create_store(&store.input, author)
            .await
            .map_err(|e| format!("store {}: {e}", store.input.name))?;
        info!(slug = %created.slug, "Seeded store");
        stores.insert(created.slug.to_string(), created.id);
    }

    for review in &seed.reviews {
        let store = stores
            .get(&review.store)
            .copied()
            .ok_or_else(|| format!("unknown store {}", review.store))?;
        let new_review = NewReview {
            store,
            author: author_of(&review.author)?,
            rating: review.rating,
            text: review.text.clone(),
        };
        catalog
            .ratings()
            .add_review(&new_review)
            .await
            .map_err(|e| format!("review of {}: {e}", review.store))?;
    }

    Ok(SeedReport {
        users: users.len(),
        stores: stores.len(),
        reviews: seed.reviews.len(),
    })
}
