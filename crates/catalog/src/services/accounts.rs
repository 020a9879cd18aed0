//! Account registration and password login.

use mockable::Clock;
use tracing::{info, instrument};

use raving_reviews_core::Email;

use super::password::{confirm_passwords, hash_password, verify_password};
use crate::error::{CatalogError, ValidationErrors};
use crate::models::{NewUser, User};
use crate::ports::{RepositoryError, UserRepository};

/// Account service.
pub struct AccountService<'a> {
    users: &'a dyn UserRepository,
    clock: &'a dyn Clock,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository, clock: &'a dyn Clock) -> Self {
        Self { users, clock }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a bad email, blank name, weak or
    /// mismatched password, or an email that is already registered.
    #[instrument(skip(self, password, confirm))]
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
        confirm: &str,
    ) -> Result<User, CatalogError> {
        let mut errors = ValidationErrors::new();

        let email = match Email::parse(email) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.add("email", "That Email is not valid!");
                None
            }
        };
        let name = name.trim();
        if name.is_empty() {
            errors.add("name", "You must supply a name!");
        }
        if let Err(password_errors) = confirm_passwords(password, confirm) {
            for e in password_errors.fields() {
                errors.add(e.field, e.message.clone());
            }
        }

        let Some(email) = email else {
            return Err(errors.into());
        };
        errors.into_result()?;

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .insert(
                &NewUser {
                    email,
                    name: name.to_owned(),
                    password_hash,
                },
                self.clock.utc(),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => CatalogError::Validation(ValidationErrors::single(
                    "email",
                    "That email is already registered",
                )),
                other => CatalogError::Repository(other),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, CatalogError> {
        let email = Email::parse(email).map_err(|_| CatalogError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(CatalogError::InvalidCredentials)?;
        let password_hash = self
            .users
            .password_hash(user.id)
            .await?
            .ok_or(CatalogError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        Ok(user)
    }
}
