//! User queries: accounts, favorites and password-reset tokens.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use raving_reviews_core::{Email, StoreId, UserId};

use super::{PgCatalog, conflict_on_unique};
use crate::models::{NewUser, PendingReset, User};
use crate::ports::{RepositoryError, UserRepository};

const USER_COLUMNS: &str =
    "id, email, name, hearts, reset_password_token, reset_password_expires, created";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    hearts: Vec<StoreId>,
    reset_password_token: Option<String>,
    reset_password_expires: Option<DateTime<Utc>>,
    created: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let pending_reset = match (r.reset_password_token, r.reset_password_expires) {
            (Some(token), Some(expires)) => Some(PendingReset { token, expires }),
            (None, None) => None,
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "user {} has a reset token without an expiry",
                    r.id
                )));
            }
        };

        Ok(Self {
            id: r.id,
            email,
            name: r.name,
            hearts: r.hearts.into_iter().collect(),
            pending_reset,
            created: r.created,
        })
    }
}

#[async_trait]
impl UserRepository for PgCatalog {
    async fn insert(
        &self,
        user: &NewUser,
        created: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO catalog.app_user (email, name, password_hash, created)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.email.as_str())
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(created)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email"))?;

        row.try_into()
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM catalog.app_user WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM catalog.app_user WHERE lower(email) = lower($1)");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM catalog.app_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hash)
    }

    async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<Option<BTreeSet<StoreId>>, RepositoryError> {
        let hearts = sqlx::query_scalar::<_, Vec<StoreId>>(
            r"
            UPDATE catalog.app_user
            SET hearts = CASE
                WHEN $2 = ANY(hearts) THEN array_remove(hearts, $2)
                ELSE array_append(hearts, $2)
            END
            WHERE id = $1
            RETURNING hearts
            ",
        )
        .bind(user)
        .bind(store)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hearts.map(|h| h.into_iter().collect()))
    }

    async fn set_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            r"
            UPDATE catalog.app_user
            SET reset_password_token = $2,
                reset_password_expires = $3
            WHERE lower(email) = lower($1)
            RETURNING {USER_COLUMNS}
            "
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .bind(token)
            .bind(expires)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_valid_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {USER_COLUMNS}
            FROM catalog.app_user
            WHERE reset_password_token = $1
              AND reset_password_expires > $2
            "
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            r"
            UPDATE catalog.app_user
            SET password_hash = $3,
                reset_password_token = NULL,
                reset_password_expires = NULL
            WHERE reset_password_token = $1
              AND reset_password_expires > $2
            RETURNING {USER_COLUMNS}
            "
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(token)
            .bind(now)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }
}
