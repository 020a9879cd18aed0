//! Persistence ports implemented by the storage adapters.
//!
//! Services only see these traits. [`crate::db`] implements them on
//! `PostgreSQL` and [`crate::memory`] implements them in process. Every
//! method that reads then writes is a single atomic call at this boundary,
//! so callers never do their own read-modify-write.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use raving_reviews_core::{Email, GeoPoint, Slug, StoreId, UserId};

use crate::models::{
    NewReview, NewUser, RankedStore, Review, ScoredStore, Store, StoreDraft, TagCount, User,
};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug or email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Failure inside a non-SQL backend (search index, lock).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Store persistence.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Slugs matching `^base(-[0-9]+)?$` case-insensitively.
    ///
    /// `exclude` leaves out the store being renamed so it does not count
    /// against itself.
    async fn slugs_in_family(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<String>, RepositoryError>;

    /// Insert a store under `slug`.
    ///
    /// Returns [`RepositoryError::Conflict`] if the slug is already taken.
    async fn insert(
        &self,
        draft: &StoreDraft,
        slug: &Slug,
        author: UserId,
        created: DateTime<Utc>,
    ) -> Result<Store, RepositoryError>;

    /// Overwrite a store's editable fields. `slug: None` keeps the current slug.
    ///
    /// Returns [`RepositoryError::NotFound`] for an unknown id and
    /// [`RepositoryError::Conflict`] if the new slug is taken.
    async fn update(
        &self,
        id: StoreId,
        draft: &StoreDraft,
        slug: Option<&Slug>,
    ) -> Result<Store, RepositoryError>;

    async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// Case-insensitive slug lookup.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError>;

    /// Stores with the given ids, newest first. Unknown ids are skipped.
    async fn get_many(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;

    /// One page of stores, newest first.
    async fn list_newest(&self, offset: u64, limit: u64) -> Result<Vec<Store>, RepositoryError>;

    /// Stores ranked by relevance of `query` against name and description,
    /// best first. `query` is never blank.
    async fn text_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError>;

    /// Stores within `max_distance_metres` of `point`, nearest first,
    /// each with its distance in metres.
    async fn near(
        &self,
        point: GeoPoint,
        max_distance_metres: f64,
        limit: usize,
    ) -> Result<Vec<(Store, f64)>, RepositoryError>;

    /// Distinct tags with usage counts, ascending by count then by tag.
    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError>;

    /// Stores carrying `tag`, or every store with at least one tag when `None`.
    async fn with_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError>;
}

/// Review persistence.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn insert(
        &self,
        review: &NewReview,
        created: DateTime<Utc>,
    ) -> Result<Review, RepositoryError>;

    /// Reviews of one store, newest first.
    async fn for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError>;

    /// Up to `limit` stores with at least `min_reviews` reviews, best average
    /// rating first, each with its reviews newest first.
    ///
    /// Equal averages keep store id order. Aggregation runs inside the
    /// backend; only the ranked stores and their reviews are returned.
    async fn top_rated(
        &self,
        min_reviews: usize,
        limit: usize,
    ) -> Result<Vec<RankedStore>, RepositoryError>;
}

/// User persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns [`RepositoryError::Conflict`] if the email is taken.
    async fn insert(&self, user: &NewUser, created: DateTime<Utc>)
    -> Result<User, RepositoryError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// The stored Argon2 PHC string for a user.
    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    /// Add `store` to the user's hearts if absent, remove it if present,
    /// in one conditional write. `None` if the user does not exist.
    async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Option<BTreeSet<StoreId>>, RepositoryError>;

    /// Store a reset token and expiry on the user with `email`,
    /// replacing any earlier one. `None` if no such user exists.
    async fn set_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;

    /// The user holding `token`, if it expires strictly after `now`.
    async fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;

    /// Set `password_hash` and clear both reset fields, only where `token`
    /// still matches and expires strictly after `now`.
    ///
    /// `None` if no row matched.
    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError>;
}
