//! Store submission, editing and lookup.

use std::future::Future;

use mockable::Clock;
use tracing::{info, instrument, warn};

use raving_reviews_core::{Slug, StoreId, UserId};

use super::slugs::SlugGenerator;
use crate::config::CatalogSettings;
use crate::error::CatalogError;
use crate::models::{Store, StoreDetail, StoreInput, StorePage};
use crate::ports::{RepositoryError, ReviewRepository, StoreRepository, UserRepository};

/// Stores shown per page of the listing.
pub const STORES_PER_PAGE: u32 = 6;

/// Store service.
///
/// Owns the write path for stores, including slug assignment, and the
/// explicit store-to-review join used by the detail page.
pub struct StoreService<'a> {
    stores: &'a dyn StoreRepository,
    reviews: &'a dyn ReviewRepository,
    users: &'a dyn UserRepository,
    clock: &'a dyn Clock,
    settings: &'a CatalogSettings,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(
        stores: &'a dyn StoreRepository,
        reviews: &'a dyn ReviewRepository,
        users: &'a dyn UserRepository,
        clock: &'a dyn Clock,
        settings: &'a CatalogSettings,
    ) -> Self {
        Self {
            stores,
            reviews,
            users,
            clock,
            settings,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Validate `input` and insert it as a new store by `author`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for bad input, and
    /// `CatalogError::Conflict` if every slug attempt collided.
    #[instrument(skip(self, input), fields(author = %author))]
    pub async fn create_store(&self, input: &StoreInput, author: UserId) -> Result<Store, CatalogError> {
        let draft = input.validate()?;
        let created = self.clock.utc();
        let stores = self.stores;
        let draft = &draft;

        let store = self
            .claim_slug(&draft.base_slug, None, |slug| async move {
                stores.insert(draft, &slug, author, created).await
            })
            .await?;

        info!(store_id = %store.id, slug = %store.slug, "Store created");
        Ok(store)
    }

    /// Apply an edit by `user` to store `id`.
    ///
    /// Ownership is checked before anything is validated or written. The slug
    /// is regenerated only when the trimmed name actually changed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound`, `CatalogError::Unauthorized`,
    /// `CatalogError::Validation` or `CatalogError::Conflict`.
    #[instrument(skip(self, input), fields(store_id = %id, user = %user))]
    pub async fn update_store(
        &self,
        id: StoreId,
        input: &StoreInput,
        user: UserId,
    ) -> Result<Store, CatalogError> {
        let current = self.get_store_for_edit(id, user).await?;
        let draft = input.validate()?;
        let stores = self.stores;
        let draft = &draft;

        let store = if draft.name == current.name {
            stores.update(id, draft, None).await?
        } else {
            self.claim_slug(&draft.base_slug, Some(id), |slug| async move {
                stores.update(id, draft, Some(&slug)).await
            })
            .await?
        };

        info!(store_id = %store.id, slug = %store.slug, "Store updated");
        Ok(store)
    }

    /// Pick a slug from `base`'s family and run `write` with it, regenerating
    /// after each unique-index conflict up to the configured limit.
    async fn claim_slug<F, Fut>(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
        mut write: F,
    ) -> Result<Store, CatalogError>
    where
        F: FnMut(Slug) -> Fut,
        Fut: Future<Output = Result<Store, RepositoryError>>,
    {
        let generator = SlugGenerator::new(self.stores);
        let limit = self.settings.slug_retry_limit.max(1);

        for attempt in 1..=limit {
            let slug = generator.next_for(base, exclude).await?;
            match write(slug.clone()).await {
                Ok(store) => return Ok(store),
                Err(RepositoryError::Conflict(_)) => {
                    warn!(attempt, slug = %slug, "Slug already taken, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(base = %base, attempts = limit, "Gave up claiming a unique slug");
        Err(CatalogError::Conflict(format!(
            "no free slug for `{base}` after {limit} attempts"
        )))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch a store without joining anything.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    pub async fn get_store(&self, id: StoreId) -> Result<Store, CatalogError> {
        self.stores
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("store {id}")))
    }

    /// Fetch a store for its edit form, only for its author.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::Unauthorized`.
    pub async fn get_store_for_edit(&self, id: StoreId, user: UserId) -> Result<Store, CatalogError> {
        let store = self.get_store(id).await?;
        if !store.is_authored_by(user) {
            warn!(store_id = %id, user = %user, "Edit attempt by non-author");
            return Err(CatalogError::Unauthorized);
        }
        Ok(store)
    }

    /// Fetch a store by slug with its author and reviews joined in.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown slug.
    #[instrument(skip(self))]
    pub async fn get_store_by_slug(&self, slug: &str) -> Result<StoreDetail, CatalogError> {
        let store = self
            .stores
            .get_by_slug(slug.trim())
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("store `{slug}`")))?;

        let author = self.users.get(store.author).await?.map(|u| u.summary());
        let reviews = self.reviews.for_store(store.id).await?;

        Ok(StoreDetail {
            store,
            author,
            reviews,
        })
    }

    /// One page of stores, newest first. Page 0 is treated as page 1.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::PageOutOfRange` with the last page when
    /// `page` is past the end.
    #[instrument(skip(self))]
    pub async fn list_stores(&self, page: u32) -> Result<StorePage, CatalogError> {
        let page = page.max(1);
        let count = self.stores.count().await?;
        let pages = u32::try_from(count.div_ceil(u64::from(STORES_PER_PAGE)))
            .unwrap_or(u32::MAX)
            .max(1);

        if page > pages {
            info!(requested = page, last = pages, "Page past the end of the listing");
            return Err(CatalogError::PageOutOfRange {
                requested: page,
                last: pages,
            });
        }

        let offset = u64::from(page - 1) * u64::from(STORES_PER_PAGE);
        let stores = self
            .stores
            .list_newest(offset, u64::from(STORES_PER_PAGE))
            .await?;

        Ok(StorePage {
            stores,
            page,
            pages,
            count,
        })
    }
}
