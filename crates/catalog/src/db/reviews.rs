//! Review queries and the top-rated aggregation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use raving_reviews_core::{Rating, ReviewId, StoreId, UserId};

use super::PgCatalog;
use crate::models::{NewReview, RankedStore, Review};
use crate::ports::{RepositoryError, ReviewRepository, StoreRepository};

const REVIEW_COLUMNS: &str = "id, store, author, rating, text, created";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    store: StoreId,
    author: UserId,
    rating: i16,
    text: String,
    created: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(r: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(r.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;
        Ok(Self {
            id: r.id,
            store: r.store,
            author: r.author,
            rating,
            text: r.text,
            created: r.created,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AverageRow {
    store: StoreId,
    average: f64,
}

#[async_trait]
impl ReviewRepository for PgCatalog {
    async fn insert(
        &self,
        review: &NewReview,
        created: DateTime<Utc>,
    ) -> Result<Review, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO catalog.review (store, author, rating, text, created)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REVIEW_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(review.store)
            .bind(review.author)
            .bind(i16::from(review.rating.value()))
            .bind(&review.text)
            .bind(created)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::NotFound;
                }
                RepositoryError::Database(e)
            })?;

        row.try_into()
    }

    async fn for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM catalog.review WHERE store = $1 \
             ORDER BY created DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(store)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    async fn top_rated(
        &self,
        min_reviews: usize,
        limit: usize,
    ) -> Result<Vec<RankedStore>, RepositoryError> {
        let min_reviews = i64::try_from(min_reviews).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let averages = sqlx::query_as::<_, AverageRow>(
            r"
            SELECT store, AVG(rating)::FLOAT8 AS average
            FROM catalog.review
            GROUP BY store
            HAVING COUNT(*) >= $1
            ORDER BY average DESC, store
            LIMIT $2
            ",
        )
        .bind(min_reviews)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        if averages.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<StoreId> = averages.iter().map(|a| a.store).collect();
        let mut stores: HashMap<StoreId, _> = StoreRepository::get_many(self, &ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM catalog.review WHERE store = ANY($1) \
             ORDER BY store, created DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;
        let mut reviews: HashMap<StoreId, Vec<Review>> = HashMap::new();
        for row in rows {
            let review = Review::try_from(row)?;
            reviews.entry(review.store).or_default().push(review);
        }

        averages
            .into_iter()
            .map(|a| {
                let store = stores.remove(&a.store).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!("review refers to missing store {}", a.store))
                })?;
                Ok(RankedStore {
                    store,
                    average_rating: a.average,
                    reviews: reviews.remove(&a.store).unwrap_or_default(),
                })
            })
            .collect()
    }
}
