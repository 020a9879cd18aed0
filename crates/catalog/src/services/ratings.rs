//! Top-rated ranking and review recording.

use mockable::Clock;
use tracing::{debug, info, instrument};

use crate::error::CatalogError;
use crate::models::{MIN_REVIEWS_FOR_RANKING, NewReview, RankedStore, Review, TOP_STORES_LIMIT};
use crate::ports::{RepositoryError, ReviewRepository};

/// Rating service.
pub struct RatingService<'a> {
    reviews: &'a dyn ReviewRepository,
    clock: &'a dyn Clock,
}

impl<'a> RatingService<'a> {
    /// Create a new rating service.
    #[must_use]
    pub const fn new(reviews: &'a dyn ReviewRepository, clock: &'a dyn Clock) -> Self {
        Self { reviews, clock }
    }

    /// Up to ten stores with at least two reviews, best average first,
    /// each with its full list of reviews.
    ///
    /// Equal averages keep catalog order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the aggregation fails.
    #[instrument(skip(self))]
    pub async fn top_stores(&self) -> Result<Vec<RankedStore>, CatalogError> {
        let ranked = self
            .reviews
            .top_rated(MIN_REVIEWS_FOR_RANKING, TOP_STORES_LIMIT)
            .await?;
        debug!(ranked = ranked.len(), "Ranked stores");
        Ok(ranked)
    }

    /// Record a review. Used by seeding; the web app never writes reviews
    /// through the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the store or author does not exist.
    #[instrument(skip(self, review), fields(store_id = %review.store))]
    pub async fn add_review(&self, review: &NewReview) -> Result<Review, CatalogError> {
        let review = self
            .reviews
            .insert(review, self.clock.utc())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    CatalogError::NotFound(format!("store {} or its author", review.store))
                }
                other => CatalogError::Repository(other),
            })?;
        info!(review_id = %review.id, rating = %review.rating, "Review recorded");
        Ok(review)
    }
}
