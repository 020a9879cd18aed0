//! Integration tests for Raving Reviews.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory catalog tests (no services needed)
//! cargo test -p raving-reviews-integration-tests
//!
//! # Include the PostgreSQL + PostGIS tests
//! CATALOG_DATABASE_URL=postgres://... cargo test -p raving-reviews-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `slugs` - Slug generation, renames and conflict retries
//! - `stores` - Store editing, ownership and pagination
//! - `search` - Text, proximity and tag search
//! - `ratings` - Top-stores aggregation
//! - `favorites` - Heart toggling
//! - `password_reset` - Reset token lifecycle
//! - `postgres` - The same operations against a real database

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use raving_reviews_catalog::memory::MemoryCatalog;
use raving_reviews_catalog::models::{ScoredStore, Store, StoreDraft, StoreInput, TagCount, User};
use raving_reviews_catalog::ports::{RepositoryError, StoreRepository};
use raving_reviews_catalog::test_support::{MutableClock, RecordingMailer, RecordingSessionIssuer};
use raving_reviews_catalog::{Catalog, CatalogSettings};
use raving_reviews_core::{GeoPoint, Slug, StoreId, UserId};

/// Password every helper-registered user gets.
pub const PASSWORD: &str = "correct horse battery";

/// Downtown Toronto, used as the origin for proximity tests.
pub const ORIGIN: (f64, f64) = (-79.3832, 43.6532);

/// Settings pointing reset links at a fixed host.
#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn settings() -> CatalogSettings {
    CatalogSettings::new(Url::parse("https://raving.example").expect("valid base URL"))
}

/// An in-memory catalog wired to recording collaborators.
pub struct TestContext {
    pub catalog: Catalog,
    pub backend: Arc<MemoryCatalog>,
    pub clock: Arc<MutableClock>,
    pub mailer: Arc<RecordingMailer>,
    pub sessions: Arc<RecordingSessionIssuer>,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(settings())
    }

    #[must_use]
    pub fn with_settings(settings: CatalogSettings) -> Self {
        Self::with_store_repository(settings, |backend| backend as Arc<dyn StoreRepository>)
    }

    /// Route store persistence through `wrap`, which receives the real
    /// in-memory backend.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory search index cannot be created.
    #[must_use]
    pub fn with_store_repository<F>(settings: CatalogSettings, wrap: F) -> Self
    where
        F: FnOnce(Arc<MemoryCatalog>) -> Arc<dyn StoreRepository>,
    {
        let backend = Arc::new(MemoryCatalog::new().expect("in-memory catalog"));
        let clock = Arc::new(MutableClock::default());
        let mailer = Arc::new(RecordingMailer::new());
        let sessions = Arc::new(RecordingSessionIssuer::new());

        let catalog = Catalog::builder(backend.clone(), settings)
            .stores(wrap(backend.clone()))
            .clock(clock.clone())
            .mailer(mailer.clone())
            .sessions(sessions.clone())
            .build();

        Self {
            catalog,
            backend,
            clock,
            mailer,
            sessions,
        }
    }

    /// Register a user named after the local part of `email`.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn register(&self, email: &str) -> User {
        let name = email.split('@').next().unwrap_or(email);
        self.catalog
            .accounts()
            .register(email, name, PASSWORD, PASSWORD)
            .await
            .expect("Failed to register test user")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A valid store input at the given coordinates.
#[must_use]
pub fn store_input(name: &str, lng: f64, lat: f64) -> StoreInput {
    StoreInput {
        name: name.to_owned(),
        description: Some(format!("All about {name}")),
        tags: Vec::new(),
        address: Some("1 Front St W, Toronto".to_owned()),
        lng: Some(lng),
        lat: Some(lat),
        photo: None,
    }
}

/// As [`store_input`], with a description and tags.
#[must_use]
pub fn described_store(name: &str, description: &str, tags: &[&str]) -> StoreInput {
    StoreInput {
        description: Some(description.to_owned()),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        ..store_input(name, ORIGIN.0, ORIGIN.1)
    }
}

// ============================================================================
// Stale slug reads
// ============================================================================

/// Store repository whose first `stale_reads` family lookups see no existing
/// slugs, as if another writer claimed them after the read.
pub struct StaleSlugReads {
    inner: Arc<MemoryCatalog>,
    stale_reads: AtomicUsize,
    family_reads: AtomicUsize,
}

impl StaleSlugReads {
    #[must_use]
    pub const fn new(inner: Arc<MemoryCatalog>, stale_reads: usize) -> Self {
        Self {
            inner,
            stale_reads: AtomicUsize::new(stale_reads),
            family_reads: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` family lookups come back empty.
    pub fn go_stale(&self, n: usize) {
        self.stale_reads.store(n, Ordering::SeqCst);
    }

    /// How many family lookups the catalog has made.
    #[must_use]
    pub fn family_reads(&self) -> usize {
        self.family_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreRepository for StaleSlugReads {
    async fn slugs_in_family(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<String>, RepositoryError> {
        self.family_reads.fetch_add(1, Ordering::SeqCst);
        let stale = self
            .stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(Vec::new());
        }
        self.inner.slugs_in_family(base, exclude).await
    }

    async fn insert(
        &self,
        draft: &StoreDraft,
        slug: &Slug,
        author: UserId,
        created: DateTime<Utc>,
    ) -> Result<Store, RepositoryError> {
        StoreRepository::insert(self.inner.as_ref(), draft, slug, author, created).await
    }

    async fn update(
        &self,
        id: StoreId,
        draft: &StoreDraft,
        slug: Option<&Slug>,
    ) -> Result<Store, RepositoryError> {
        self.inner.update(id, draft, slug).await
    }

    async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        StoreRepository::get(self.inner.as_ref(), id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        self.inner.get_by_slug(slug).await
    }

    async fn get_many(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        self.inner.get_many(ids).await
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.inner.count().await
    }

    async fn list_newest(&self, offset: u64, limit: u64) -> Result<Vec<Store>, RepositoryError> {
        self.inner.list_newest(offset, limit).await
    }

    async fn text_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError> {
        self.inner.text_search(query, limit).await
    }

    async fn near(
        &self,
        point: GeoPoint,
        max_distance_metres: f64,
        limit: usize,
    ) -> Result<Vec<(Store, f64)>, RepositoryError> {
        self.inner.near(point, max_distance_metres, limit).await
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        self.inner.tag_counts().await
    }

    async fn with_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        self.inner.with_tag(tag).await
    }
}
