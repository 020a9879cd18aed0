//! Review domain types and rating aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use raving_reviews_core::rating::average;
use raving_reviews_core::{Rating, ReviewId, StoreId, UserId};

/// Minimum number of reviews before a store is ranked.
pub const MIN_REVIEWS_FOR_RANKING: usize = 2;

/// Maximum number of stores in the top-rated ranking.
pub const TOP_STORES_LIMIT: usize = 10;

/// A review of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    /// Store being reviewed.
    pub store: StoreId,
    pub author: UserId,
    pub rating: Rating,
    pub text: String,
    pub created: DateTime<Utc>,
}

/// A review to insert.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewReview {
    pub store: StoreId,
    pub author: UserId,
    pub rating: Rating,
    pub text: String,
}

/// Average rating for one store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub store: StoreId,
    pub average: f64,
    pub review_count: u64,
}

/// Rank stores by average rating.
///
/// `joined` is the store-to-reviews join in the order the backend produced
/// it. Stores with fewer than `min_reviews` reviews are dropped rather than
/// scored as zero. The sort is stable, so stores with equal averages keep
/// their join order; no secondary key is applied.
#[must_use]
pub fn rank_by_average<'a, I>(joined: I, min_reviews: usize, limit: usize) -> Vec<RatingSummary>
where
    I: IntoIterator<Item = (StoreId, &'a [Review])>,
{
    let mut summaries: Vec<RatingSummary> = joined
        .into_iter()
        .filter(|(_, reviews)| reviews.len() >= min_reviews)
        .filter_map(|(store, reviews)| {
            let avg = average(reviews.iter().map(|r| r.rating))?;
            Some(RatingSummary {
                store,
                average: avg,
                review_count: reviews.len() as u64,
            })
        })
        .collect();

    summaries.sort_by(|a, b| b.average.total_cmp(&a.average));
    summaries.truncate(limit);
    summaries
}
