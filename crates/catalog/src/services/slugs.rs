//! Unique slug selection.

use tracing::instrument;

use raving_reviews_core::{Slug, StoreId};

use crate::error::{CatalogError, ValidationErrors};
use crate::ports::StoreRepository;

/// Picks the first free slug for a store name.
///
/// The choice is only a candidate: the unique index on `slug` is the final
/// arbiter, and callers retry on `Conflict`.
pub struct SlugGenerator<'a> {
    stores: &'a dyn StoreRepository,
}

impl<'a> SlugGenerator<'a> {
    #[must_use]
    pub const fn new(stores: &'a dyn StoreRepository) -> Self {
        Self { stores }
    }

    /// Derive a unique slug for `name`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` on `name` if nothing slug-worthy
    /// remains after normalization, or `CatalogError::Repository` if the
    /// lookup fails.
    #[instrument(skip(self))]
    pub async fn generate_slug(&self, name: &str) -> Result<Slug, CatalogError> {
        let base = Slug::from_name(name)
            .map_err(|_| ValidationErrors::single("name", "Please enter a store name!"))?;
        self.next_for(&base, None).await
    }

    /// First free member of `base`'s family, ignoring the store `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the lookup fails.
    pub async fn next_for(&self, base: &Slug, exclude: Option<StoreId>) -> Result<Slug, CatalogError> {
        let existing = self.stores.slugs_in_family(base, exclude).await?;
        Ok(base.next_available(&existing))
    }
}
