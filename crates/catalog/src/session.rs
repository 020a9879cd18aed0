//! Session boundary.
//!
//! After a successful password reset the user is logged straight in. The
//! catalog hands the user to a [`SessionIssuer`], which returns the identity
//! the request layer stores in its session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use raving_reviews_core::{Email, UserId};

use crate::models::User;

/// Errors that can occur while establishing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(String),
}

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// When the session was established.
    pub logged_in_at: DateTime<Utc>,
}

/// Establishes a logged-in session for a user.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn establish(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<CurrentUser, SessionError>;
}

/// Issuer that only builds the identity; the request layer persists it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatelessSessionIssuer;

#[async_trait]
impl SessionIssuer for StatelessSessionIssuer {
    async fn establish(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<CurrentUser, SessionError> {
        Ok(CurrentUser {
            id: user.id,
            email: user.email.clone(),
            logged_in_at: now,
        })
    }
}
