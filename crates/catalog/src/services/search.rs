//! Lexical, proximity and tag search over stores.

use tracing::{debug, instrument};

use raving_reviews_core::GeoPoint;

use crate::error::CatalogError;
use crate::models::{NearbyStore, ScoredStore, TagListing};
use crate::ports::StoreRepository;

/// Maximum hits returned by a text search.
pub const TEXT_SEARCH_LIMIT: usize = 5;

/// Maximum stores returned by a proximity search.
pub const NEAR_LIMIT: usize = 10;

/// Radius of a proximity search.
pub const NEAR_MAX_DISTANCE_METRES: f64 = 10_000.0;

/// Search service.
pub struct SearchService<'a> {
    stores: &'a dyn StoreRepository,
}

impl<'a> SearchService<'a> {
    /// Create a new search service.
    #[must_use]
    pub const fn new(stores: &'a dyn StoreRepository) -> Self {
        Self { stores }
    }

    /// Stores matching `query` by relevance against name and description,
    /// best first, at most five.
    ///
    /// A blank query returns nothing rather than everything.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the backend search fails.
    #[instrument(skip(self))]
    pub async fn search_by_text(&self, query: &str) -> Result<Vec<ScoredStore>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = self.stores.text_search(query, TEXT_SEARCH_LIMIT).await?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(TEXT_SEARCH_LIMIT);

        debug!(hits = hits.len(), "Text search complete");
        Ok(hits)
    }

    /// The nearest stores within 10 km of the given point, at most ten.
    ///
    /// Coordinates arrive as raw request strings.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidInput` if either coordinate is missing,
    /// not a number, or out of range.
    #[instrument(skip(self))]
    pub async fn search_near(
        &self,
        lng: Option<&str>,
        lat: Option<&str>,
    ) -> Result<Vec<NearbyStore>, CatalogError> {
        let point = GeoPoint::parse(lng, lat).map_err(|e| CatalogError::InvalidInput(e.to_string()))?;
        self.near_point(point).await
    }

    /// As [`Self::search_near`], for an already-validated point.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the backend query fails.
    pub async fn near_point(&self, point: GeoPoint) -> Result<Vec<NearbyStore>, CatalogError> {
        let mut hits = self
            .stores
            .near(point, NEAR_MAX_DISTANCE_METRES, NEAR_LIMIT)
            .await?;
        hits.retain(|(_, distance)| *distance <= NEAR_MAX_DISTANCE_METRES);
        hits.sort_by(|(_, a), (_, b)| a.total_cmp(b));
        hits.truncate(NEAR_LIMIT);

        Ok(hits
            .into_iter()
            .map(|(store, distance)| NearbyStore::from_store(store, distance))
            .collect())
    }

    /// Stores carrying `tag` (any tag when `None`) plus every tag in use with
    /// its count, ascending.
    ///
    /// A blank tag counts as no tag.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if either query fails.
    #[instrument(skip(self))]
    pub async fn list_by_tag(&self, tag: Option<&str>) -> Result<TagListing, CatalogError> {
        let selected = tag.map(str::trim).filter(|t| !t.is_empty());

        let tags = self.stores.tag_counts().await?;
        let stores = self.stores.with_tag(selected).await?;

        Ok(TagListing {
            tags,
            selected: selected.map(str::to_owned),
            stores,
        })
    }
}
