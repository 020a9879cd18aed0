//! Unified error handling for catalog operations.
//!
//! Every service returns `Result<T, CatalogError>`. The variants are the
//! conditions a request layer has to tell apart: field-level validation
//! failures, missing records, ownership violations, reset-token failures,
//! retryable slug conflicts, malformed coordinates and collaborator failures.

use core::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::mail::MailError;
use crate::ports::RepositoryError;
use crate::session::SessionError;

/// A single invalid input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the offending field (e.g. `name`, `location.address`).
    pub field: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

/// All validation failures found in one input, reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Create an empty error collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a failure for `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Shorthand for a collection holding a single failure.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Returns true if no failures were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The recorded failures, in the order they were found.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Returns true if `field` has at least one failure.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collection itself when it holds any failure.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Errors returned by catalog services.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input failed validation; carries field-level detail.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The named record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The current user does not own the record they tried to change.
    #[error("you must be the owner of this store to edit it")]
    Unauthorized,

    /// Wrong email or password at login.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Reset token is unknown, expired or already used.
    ///
    /// These cases are deliberately indistinguishable.
    #[error("password reset is invalid or has expired")]
    InvalidOrExpired,

    /// A unique slug could not be claimed before the retry limit ran out.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed request input outside a form (e.g. map coordinates).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A requested page lies past the last page.
    #[error("page {requested} is past the last page ({last})")]
    PageOutOfRange {
        /// Page that was asked for.
        requested: u32,
        /// Last page that has stores.
        last: u32,
    },

    /// The reset email could not be delivered. The token was already stored.
    #[error("mail delivery failed: {0}")]
    Delivery(#[from] MailError),

    /// A session could not be established after a successful reset.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Persistence failure.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing failed.
    #[error("password hashing error")]
    PasswordHash,

    /// A configured setting cannot be applied (e.g. a token lifetime that
    /// overflows the calendar).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CatalogError {
    /// Returns true if repeating the operation may succeed.
    ///
    /// Slug conflicts are already retried inside the service; a caller that
    /// still sees one can submit the same input again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Field-level details for validation failures.
    #[must_use]
    pub const fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Please enter a name");
        errors.add("location.address", "You must supply an address");
        let err = CatalogError::from(errors);
        assert_eq!(
            err.to_string(),
            "validation failed: name: Please enter a name; location.address: You must supply an address"
        );
        assert!(err.validation().is_some_and(|v| v.has("location.address")));
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(CatalogError::Conflict("slug".to_string()).is_retryable());
        assert!(!CatalogError::Unauthorized.is_retryable());
        assert!(!CatalogError::InvalidOrExpired.is_retryable());
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let errors = ValidationErrors::single("tags", "bad").into_result().unwrap_err();
        assert!(errors.has("tags"));
    }
}
