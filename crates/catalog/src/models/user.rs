//! User domain types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use raving_reviews_core::{Email, StoreId, UserId};

/// A registered user (domain type).
///
/// The password hash is never carried here; it is read separately when a
/// password has to be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Normalized (trimmed, lowercased) email.
    pub email: Email,
    pub name: String,
    /// Stores this user has hearted.
    pub hearts: BTreeSet<StoreId>,
    /// Outstanding password reset, if one was requested.
    pub pending_reset: Option<PendingReset>,
    pub created: DateTime<Utc>,
}

impl User {
    /// Public projection shown next to stores and reviews.
    #[must_use]
    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// A stored reset token and its expiry. Both are set or neither is.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl PendingReset {
    /// Returns true while the token can still be redeemed.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }
}

impl std::fmt::Debug for PendingReset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReset")
            .field("token", &"[REDACTED]")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Author details joined onto stores and reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorSummary {
    pub id: UserId,
    pub name: String,
}

/// A user to insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
}

/// Outcome of toggling a favorite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartToggle {
    /// True if the store is now in the set.
    pub hearted: bool,
    /// The user's full heart set after the toggle.
    pub hearts: BTreeSet<StoreId>,
}
