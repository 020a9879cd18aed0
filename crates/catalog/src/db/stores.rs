//! Store queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use raving_reviews_core::{GeoPoint, Location, Slug, StoreId, UserId};

use super::{PgCatalog, conflict_on_unique, count_from_db};
use crate::models::{ScoredStore, Store, StoreDraft, TagCount};
use crate::ports::{RepositoryError, StoreRepository};

/// Columns selected for every store read, decoding the geography point.
const STORE_COLUMNS: &str = "id, slug, name, description, tags, created, \
     ST_X(location::geometry) AS lng, ST_Y(location::geometry) AS lat, \
     address, photo, author";

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    slug: String,
    name: String,
    description: Option<String>,
    tags: Vec<String>,
    created: DateTime<Utc>,
    lng: f64,
    lat: f64,
    address: String,
    photo: Option<String>,
    author: UserId,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(r: StoreRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&r.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid slug in database: {e}"))
        })?;
        let point = GeoPoint::new(r.lng, r.lat).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid location in database: {e}"))
        })?;

        Ok(Self {
            id: r.id,
            slug,
            name: r.name,
            description: r.description,
            tags: r.tags,
            created: r.created,
            location: Location {
                point,
                address: r.address,
            },
            photo: r.photo,
            author: r.author,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ScoredRow {
    #[sqlx(flatten)]
    store: StoreRow,
    score: f32,
}

#[derive(Debug, sqlx::FromRow)]
struct NearRow {
    #[sqlx(flatten)]
    store: StoreRow,
    distance: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct TagCountRow {
    tag: String,
    count: i64,
}

fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(Store::try_from).collect()
}

#[async_trait]
impl StoreRepository for PgCatalog {
    async fn slugs_in_family(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<Vec<String>, RepositoryError> {
        // Base slugs are limited to [a-z0-9-], so they are safe inside the pattern.
        let slugs = sqlx::query_scalar::<_, String>(
            r"
            SELECT slug
            FROM catalog.store
            WHERE slug ~* ('^' || $1 || '(-[0-9]+)?$')
              AND ($2::BIGINT IS NULL OR id <> $2)
            ",
        )
        .bind(base.as_str())
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        Ok(slugs)
    }

    async fn insert(
        &self,
        draft: &StoreDraft,
        slug: &Slug,
        author: UserId,
        created: DateTime<Utc>,
    ) -> Result<Store, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO catalog.store
                (slug, name, description, tags, created, location, address, photo, author)
            VALUES
                ($1, $2, $3, $4, $5,
                 ST_SetSRID(ST_MakePoint($6, $7), 4326)::geography,
                 $8, $9, $10)
            RETURNING {STORE_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, StoreRow>(&sql)
            .bind(slug.as_str())
            .bind(&draft.name)
            .bind(draft.description.as_deref())
            .bind(&draft.tags)
            .bind(created)
            .bind(draft.location.point.lng())
            .bind(draft.location.point.lat())
            .bind(&draft.location.address)
            .bind(draft.photo.as_deref())
            .bind(author)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "slug"))?;

        row.try_into()
    }

    async fn update(
        &self,
        id: StoreId,
        draft: &StoreDraft,
        slug: Option<&Slug>,
    ) -> Result<Store, RepositoryError> {
        // A missing photo keeps the one already on file.
        let sql = format!(
            r"
            UPDATE catalog.store
            SET name = $2,
                description = $3,
                tags = $4,
                location = ST_SetSRID(ST_MakePoint($5, $6), 4326)::geography,
                address = $7,
                photo = COALESCE($8, photo),
                slug = COALESCE($9, slug)
            WHERE id = $1
            RETURNING {STORE_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, StoreRow>(&sql)
            .bind(id)
            .bind(&draft.name)
            .bind(draft.description.as_deref())
            .bind(&draft.tags)
            .bind(draft.location.point.lng())
            .bind(draft.location.point.lat())
            .bind(&draft.location.address)
            .bind(draft.photo.as_deref())
            .bind(slug.map(Slug::as_str))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "slug"))?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM catalog.store WHERE id = $1");
        sqlx::query_as::<_, StoreRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Store::try_from)
            .transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM catalog.store WHERE lower(slug) = lower($1)");
        sqlx::query_as::<_, StoreRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .map(Store::try_from)
            .transpose()
    }

    async fn get_many(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let sql = format!(
            "SELECT {STORE_COLUMNS} FROM catalog.store WHERE id = ANY($1) \
             ORDER BY created DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, StoreRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        into_stores(rows)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM catalog.store")
            .fetch_one(&self.pool)
            .await?;
        count_from_db(count)
    }

    async fn list_newest(&self, offset: u64, limit: u64) -> Result<Vec<Store>, RepositoryError> {
        let offset = i64::try_from(offset)
            .map_err(|_| RepositoryError::Backend(format!("offset {offset} too large")))?;
        let limit = i64::try_from(limit)
            .map_err(|_| RepositoryError::Backend(format!("limit {limit} too large")))?;
        let sql = format!(
            "SELECT {STORE_COLUMNS} FROM catalog.store \
             ORDER BY created DESC, id DESC OFFSET $1 LIMIT $2"
        );
        let rows = sqlx::query_as::<_, StoreRow>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        into_stores(rows)
    }

    async fn text_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredStore>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        // Any term may match: the stemmed lexemes are joined with OR. A query
        // made only of stop words yields a NULL tsquery, which matches nothing.
        let sql = format!(
            r"
            SELECT {STORE_COLUMNS}, ts_rank(search, q) AS score
            FROM catalog.store,
                 NULLIF(replace(plainto_tsquery('english', $1)::TEXT, ' & ', ' | '), '')::tsquery AS q
            WHERE search @@ q
            ORDER BY score DESC
            LIMIT $2
            "
        );
        let rows = sqlx::query_as::<_, ScoredRow>(&sql)
            .bind(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| {
                Ok(ScoredStore {
                    store: r.store.try_into()?,
                    score: r.score,
                })
            })
            .collect()
    }

    async fn near(
        &self,
        point: GeoPoint,
        max_distance_metres: f64,
        limit: usize,
    ) -> Result<Vec<(Store, f64)>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        // Sphere rather than spheroid, so distances match the great-circle formula.
        let sql = format!(
            r"
            SELECT {STORE_COLUMNS}, ST_Distance(location, origin, false) AS distance
            FROM catalog.store,
                 ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography AS origin
            WHERE ST_DWithin(location, origin, $3, false)
            ORDER BY distance, id
            LIMIT $4
            "
        );
        let rows = sqlx::query_as::<_, NearRow>(&sql)
            .bind(point.lng())
            .bind(point.lat())
            .bind(max_distance_metres)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| Ok((r.store.try_into()?, r.distance)))
            .collect()
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            r"
            SELECT tag, COUNT(*) AS count
            FROM catalog.store, unnest(tags) AS tag
            GROUP BY tag
            ORDER BY count ASC, tag ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(TagCount {
                    tag: r.tag,
                    count: count_from_db(r.count)?,
                })
            })
            .collect()
    }

    async fn with_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {STORE_COLUMNS}
            FROM catalog.store
            WHERE CASE WHEN $1::TEXT IS NULL THEN cardinality(tags) > 0
                       ELSE $1 = ANY(tags) END
            ORDER BY id
            "
        );
        let rows = sqlx::query_as::<_, StoreRow>(&sql)
            .bind(tag)
            .fetch_all(&self.pool)
            .await?;
        into_stores(rows)
    }
}
