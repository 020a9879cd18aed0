//! In-process storage adapter.
//!
//! `MemoryCatalog` implements every repository port without a database, for
//! tests, demos and the CLI's offline mode. All tables sit behind one async
//! mutex, so each port call is atomic just like a single SQL statement.
//! Relevance search goes through a Tantivy RAM index and proximity search
//! uses great-circle distance.

mod search;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use raving_reviews_core::{Email, GeoPoint, ReviewId, Slug, StoreId, UserId};

pub use search::StoreIndex;

use crate::models::{
    NewReview, NewUser, PendingReset, RankedStore, Review, ScoredStore, Store, StoreDraft,
    TagCount, User, rank_by_average,
};
use crate::ports::{RepositoryError, ReviewRepository, StoreRepository, UserRepository};

struct UserRecord {
    user: User,
    password_hash: String,
}

struct Tables {
    users: Vec<UserRecord>,
    stores: Vec<Store>,
    reviews: Vec<Review>,
    next_user_id: i64,
    next_store_id: i64,
    next_review_id: i64,
    index: StoreIndex,
}

impl Tables {
    fn store_mut(&mut self, id: StoreId) -> Option<&mut Store> {
        self.stores.iter_mut().find(|s| s.id == id)
    }

    fn slug_taken(&self, slug: &Slug, except: Option<StoreId>) -> bool {
        self.stores
            .iter()
            .any(|s| Some(s.id) != except && s.slug.as_str().eq_ignore_ascii_case(slug.as_str()))
    }

    fn user_by_token_mut(&mut self, token: &str, now: DateTime<Utc>) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|r| {
            r.user
                .pending_reset
                .as_ref()
                .is_some_and(|p| p.token == token && p.is_valid_at(now))
        })
    }
}

/// Newest first, ties broken by id so the order is total.
fn newest_first(stores: &mut [Store]) {
    stores.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
}

/// In-memory implementation of the catalog repository ports.
pub struct MemoryCatalog {
    tables: Mutex<Tables>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the search index cannot be created.
    pub fn new() -> Result<Self, RepositoryError> {
        Ok(Self {
            tables: Mutex::new(Tables {
                users: Vec::new(),
                stores: Vec::new(),
                reviews: Vec::new(),
                next_user_id: 1,
                next_store_id: 1,
                next_review_id: 1,
                index: StoreIndex::new()?,
            }),
        })
    }
}

#[async_trait]
impl StoreRepository for MemoryCatalog {
    async fn slugs_in_family(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<String>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .stores
            .iter()
            .filter(|s| Some(s.id) != exclude && base.is_family_member(s.slug.as_str()))
            .map(|s| s.slug.as_str().to_owned())
            .collect())
    }

    async fn insert(
        &self,
        draft: &StoreDraft,
        slug: &Slug,
        author: UserId,
        created: DateTime<Utc>,
    ) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.slug_taken(slug, None) {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        let store = Store {
            id: StoreId::new(tables.next_store_id),
            slug: slug.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            tags: draft.tags.clone(),
            created,
            location: draft.location.clone(),
            photo: draft.photo.clone(),
            author,
        };
        tables.index.upsert(&store)?;
        tables.next_store_id += 1;
        tables.stores.push(store.clone());
        Ok(store)
    }

    async fn update(
        &self,
        id: StoreId,
        draft: &StoreDraft,
        slug: Option<&Slug>,
    ) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(slug) = slug
            && tables.slug_taken(slug, Some(id))
        {
            return Err(RepositoryError::Conflict("slug already exists".to_owned()));
        }

        let mut updated = tables
            .stores
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        updated.name.clone_from(&draft.name);
        updated.description.clone_from(&draft.description);
        updated.tags.clone_from(&draft.tags);
        updated.location = draft.location.clone();
        if let Some(photo) = &draft.photo {
            updated.photo = Some(photo.clone());
        }
        if let Some(slug) = slug {
            updated.slug = slug.clone();
        }

        // The row only changes once the index has accepted it.
        tables.index.upsert(&updated)?;
        if let Some(store) = tables.store_mut(id) {
            *store = updated.clone();
        }
        Ok(updated)
    }

    async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.stores.iter().find(|s| s.id == id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .stores
            .iter()
            .find(|s| s.slug.as_str().eq_ignore_ascii_case(slug))
            .cloned())
    }

    async fn get_many(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut stores: Vec<Store> = tables
            .stores
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect();
        newest_first(&mut stores);
        Ok(stores)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.stores.len() as u64)
    }

    async fn list_newest(&self, offset: u64, limit: u64) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut stores = tables.stores.clone();
        drop(tables);

        newest_first(&mut stores);
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(stores.into_iter().skip(offset).take(limit).collect())
    }

    async fn text_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError> {
        let tables = self.tables.lock().await;
        let hits = tables.index.search(query, limit)?;

        hits.into_iter()
            .map(|(id, score)| {
                let store = tables
                    .stores
                    .iter()
                    .find(|s| s.id == id)
                    .cloned()
                    .ok_or_else(|| {
                        RepositoryError::DataCorruption(format!("index refers to missing store {id}"))
                    })?;
                Ok(ScoredStore { store, score })
            })
            .collect()
    }

    async fn near(
        &self,
        point: GeoPoint,
        max_distance_metres: f64,
        limit: usize,
    ) -> Result<Vec<(Store, f64)>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut hits: Vec<(Store, f64)> = tables
            .stores
            .iter()
            .map(|s| (s, point.distance_metres(&s.location.point)))
            .filter(|(_, d)| *d <= max_distance_metres)
            .map(|(s, d)| (s.clone(), d))
            .collect();
        drop(tables);

        hits.sort_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for tag in tables.stores.iter().flat_map(|s| s.tags.iter()) {
            *counts.entry(tag.as_str()).or_default() += 1;
        }

        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag: tag.to_owned(),
                count,
            })
            .collect();
        // Stable, so equal counts stay in tag-name order.
        tags.sort_by_key(|t| t.count);
        Ok(tags)
    }

    async fn with_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .stores
            .iter()
            .filter(|s| tag.map_or(!s.tags.is_empty(), |t| s.has_tag(t)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReviewRepository for MemoryCatalog {
    async fn insert(
        &self,
        review: &NewReview,
        created: DateTime<Utc>,
    ) -> Result<Review, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let store_exists = tables.stores.iter().any(|s| s.id == review.store);
        let author_exists = tables.users.iter().any(|r| r.user.id == review.author);
        if !store_exists || !author_exists {
            return Err(RepositoryError::NotFound);
        }

        let review = Review {
            id: ReviewId::new(tables.next_review_id),
            store: review.store,
            author: review.author,
            rating: review.rating,
            text: review.text.clone(),
            created,
        };
        tables.next_review_id += 1;
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.store == store)
            .cloned()
            .collect();
        drop(tables);

        reviews.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    async fn top_rated(
        &self,
        min_reviews: usize,
        limit: usize,
    ) -> Result<Vec<RankedStore>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut joined: Vec<(&Store, Vec<Review>)> = tables
            .stores
            .iter()
            .map(|store| {
                let mut reviews: Vec<Review> = tables
                    .reviews
                    .iter()
                    .filter(|r| r.store == store.id)
                    .cloned()
                    .collect();
                reviews.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
                (store, reviews)
            })
            .collect();

        let ranking = rank_by_average(
            joined.iter().map(|(store, reviews)| (store.id, reviews.as_slice())),
            min_reviews,
            limit,
        );

        let mut ranked = Vec::with_capacity(ranking.len());
        for summary in ranking {
            let Some(pos) = joined.iter().position(|(s, _)| s.id == summary.store) else {
                continue;
            };
            let (store, reviews) = joined.swap_remove(pos);
            ranked.push(RankedStore {
                store: store.clone(),
                average_rating: summary.average,
                reviews,
            });
        }
        Ok(ranked)
    }
}

#[async_trait]
impl UserRepository for MemoryCatalog {
    async fn insert(
        &self,
        user: &NewUser,
        created: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|r| r.user.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let record = UserRecord {
            user: User {
                id: UserId::new(tables.next_user_id),
                email: user.email.clone(),
                name: user.name.clone(),
                hearts: BTreeSet::new(),
                pending_reset: None,
                created,
            },
            password_hash: user.password_hash.clone(),
        };
        tables.next_user_id += 1;
        let created_user = record.user.clone();
        tables.users.push(record);
        Ok(created_user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|r| &r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.password_hash.clone()))
    }

    async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Option<BTreeSet<StoreId>>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let Some(record) = tables.users.iter_mut().find(|r| r.user.id == user) else {
            return Ok(None);
        };

        let hearts = &mut record.user.hearts;
        if !hearts.remove(&store) {
            hearts.insert(store);
        }
        Ok(Some(hearts.clone()))
    }

    async fn set_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let Some(record) = tables.users.iter_mut().find(|r| &r.user.email == email) else {
            return Ok(None);
        };

        record.user.pending_reset = Some(PendingReset {
            token: token.to_owned(),
            expires,
        });
        Ok(Some(record.user.clone()))
    }

    async fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.user_by_token_mut(token, now).map(|r| r.user.clone()))
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let Some(record) = tables.user_by_token_mut(token, now) else {
            return Ok(None);
        };

        password_hash.clone_into(&mut record.password_hash);
        record.user.pending_reset = None;
        Ok(Some(record.user.clone()))
    }
}
