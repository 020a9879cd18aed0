//! Hearting stores.

use tracing::{info, instrument};

use raving_reviews_core::{StoreId, UserId};

use crate::error::CatalogError;
use crate::models::{HeartToggle, Store};
use crate::ports::{StoreRepository, UserRepository};

/// Favorites service.
pub struct FavoritesService<'a> {
    users: &'a dyn UserRepository,
    stores: &'a dyn StoreRepository,
}

impl<'a> FavoritesService<'a> {
    /// Create a new favorites service.
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository, stores: &'a dyn StoreRepository) -> Self {
        Self { users, stores }
    }

    /// Add `store` to the user's hearts, or remove it if already there.
    ///
    /// The flip is a single conditional write, so concurrent toggles never
    /// lose an update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the store or user does not exist.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<HeartToggle, CatalogError> {
        if self.stores.get(store).await?.is_none() {
            return Err(CatalogError::NotFound(format!("store {store}")));
        }

        let hearts = self
            .users
            .toggle_heart(user, store)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("user {user}")))?;

        let hearted = hearts.contains(&store);
        info!(hearted, total = hearts.len(), "Heart toggled");
        Ok(HeartToggle { hearted, hearts })
    }

    /// The stores the user has hearted, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn hearted_stores(&self, user: UserId) -> Result<Vec<Store>, CatalogError> {
        let user = self
            .users
            .get(user)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("user {user}")))?;

        let ids: Vec<StoreId> = user.hearts.into_iter().collect();
        Ok(self.stores.get_many(&ids).await?)
    }
}
