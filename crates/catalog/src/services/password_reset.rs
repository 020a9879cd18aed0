//! Password-reset token lifecycle.
//!
//! A user is either without a token or has one pending, together with its
//! expiry. Issuing stores both fields; consuming clears both in the same
//! conditional write that sets the new password. An expired token is simply
//! never matched again: its fields stay until the next issue or consume.

use mockable::Clock;
use tracing::{info, instrument, warn};

use raving_reviews_core::Email;

use super::password::{confirm_passwords, generate_reset_token, hash_password};
use crate::config::{CatalogSettings, ConfigError, UnknownEmailPolicy};
use crate::error::{CatalogError, ValidationErrors};
use crate::mail::{Mailer, PasswordResetMail};
use crate::models::User;
use crate::ports::UserRepository;
use crate::session::{CurrentUser, SessionIssuer};

/// Password-reset service.
pub struct PasswordResetService<'a> {
    users: &'a dyn UserRepository,
    mailer: &'a dyn Mailer,
    sessions: &'a dyn SessionIssuer,
    clock: &'a dyn Clock,
    settings: &'a CatalogSettings,
}

impl<'a> PasswordResetService<'a> {
    /// Create a new password-reset service.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserRepository,
        mailer: &'a dyn Mailer,
        sessions: &'a dyn SessionIssuer,
        clock: &'a dyn Clock,
        settings: &'a CatalogSettings,
    ) -> Self {
        Self {
            users,
            mailer,
            sessions,
            clock,
            settings,
        }
    }

    /// Issue a reset token for `email` and mail the reset link.
    ///
    /// The token is stored before the mail is attempted. For an unregistered
    /// email the configured [`UnknownEmailPolicy`] decides between a silent
    /// success and `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a malformed email,
    /// `CatalogError::NotFound` for an unknown email under `Disclose`,
    /// `CatalogError::Config` if the configured lifetime pushes the expiry
    /// past the representable range, and `CatalogError::Delivery` if the
    /// mail could not be sent (the token remains valid).
    #[instrument(skip_all)]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), CatalogError> {
        let email = Email::parse(email)
            .map_err(|_| ValidationErrors::single("email", "That Email is not valid!"))?;

        let token = generate_reset_token();
        let expires = self
            .clock
            .utc()
            .checked_add_signed(self.settings.reset_token_ttl)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "CATALOG_RESET_TOKEN_TTL_SECS".to_owned(),
                    "token expiry overflows the calendar".to_owned(),
                )
            })?;

        let Some(user) = self.users.set_reset_token(&email, &token, expires).await? else {
            return match self.settings.unknown_email_policy {
                UnknownEmailPolicy::Conceal => {
                    info!("Reset requested for unknown email; concealed");
                    Ok(())
                }
                UnknownEmailPolicy::Disclose => Err(CatalogError::NotFound(
                    "No account with that email exists.".to_owned(),
                )),
            };
        };
        info!(user_id = %user.id, %expires, "Reset token issued");

        let mail = PasswordResetMail::new(user.email.clone(), self.settings.reset_url(&token));
        if let Err(e) = self.mailer.send_password_reset(&mail).await {
            warn!(user_id = %user.id, error = %e, "Reset mail failed; token left in place");
            return Err(CatalogError::Delivery(e));
        }

        info!(user_id = %user.id, "Reset mail sent");
        Ok(())
    }

    /// The user holding `token`, if it has not expired.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidOrExpired` for unknown, expired and
    /// already-used tokens alike.
    #[instrument(skip_all)]
    pub async fn validate_reset_token(&self, token: &str) -> Result<User, CatalogError> {
        self.users
            .find_by_valid_reset_token(token, self.clock.utc())
            .await?
            .ok_or(CatalogError::InvalidOrExpired)
    }

    /// Set a new password using `token`, then log the user in.
    ///
    /// The token is consumed by the same write that stores the new hash, so
    /// it works exactly once.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the passwords differ or are too
    /// short, `CatalogError::InvalidOrExpired` if the token cannot be used,
    /// and `CatalogError::Session` if the session could not be established
    /// after the password was changed.
    #[instrument(skip_all)]
    pub async fn consume_reset_token(
        &self,
        token: &str,
        password: &str,
        confirm: &str,
    ) -> Result<CurrentUser, CatalogError> {
        confirm_passwords(password, confirm)?;
        let password_hash = hash_password(password)?;

        let now = self.clock.utc();
        let user = self
            .users
            .consume_reset_token(token, now, &password_hash)
            .await?
            .ok_or_else(|| {
                info!("Reset attempted with an invalid or expired token");
                CatalogError::InvalidOrExpired
            })?;
        info!(user_id = %user.id, "Password reset");

        let session = self.sessions.establish(&user, now).await?;
        Ok(session)
    }
}
