//! Outgoing mail boundary.
//!
//! The catalog only composes the password-reset message. Delivery belongs to
//! whatever implements [`Mailer`].

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use raving_reviews_core::Email;

/// Subject line of the password-reset message.
pub const PASSWORD_RESET_SUBJECT: &str = "Password Reset";

/// Errors reported by a mail transport.
#[derive(Debug, Error)]
pub enum MailError {
    /// The transport refused or failed to send the message.
    #[error("transport error: {0}")]
    Transport(String),

    /// The message could not be rendered.
    #[error("render error: {0}")]
    Render(String),
}

/// A password-reset email.
#[derive(Clone, Serialize)]
pub struct PasswordResetMail {
    pub to: Email,
    pub subject: String,
    /// Link containing the reset token.
    pub reset_url: String,
}

impl PasswordResetMail {
    #[must_use]
    pub fn new(to: Email, reset_url: String) -> Self {
        Self {
            to,
            subject: PASSWORD_RESET_SUBJECT.to_owned(),
            reset_url,
        }
    }
}

impl std::fmt::Debug for PasswordResetMail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordResetMail")
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("reset_url", &"[REDACTED]")
            .finish()
    }
}

/// Sends mail on behalf of the catalog.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, mail: &PasswordResetMail) -> Result<(), MailError>;
}

/// Mailer that only records the send in the log, for local runs and the CLI.
///
/// The reset URL is left out of the event since it carries the token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send_password_reset(&self, mail: &PasswordResetMail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "Password reset mail queued");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_reset_url() {
        let mail = PasswordResetMail::new(
            Email::parse("wes@example.com").unwrap(),
            "https://reviews.example.com/account/reset/cafef00d".to_owned(),
        );
        let debug = format!("{mail:?}");
        assert!(!debug.contains("cafef00d"));
        assert!(debug.contains("wes@example.com"));
        assert_eq!(mail.subject, PASSWORD_RESET_SUBJECT);
    }

    #[tokio::test]
    async fn test_tracing_mailer_accepts() {
        let mail = PasswordResetMail::new(
            Email::parse("wes@example.com").unwrap(),
            "https://reviews.example.com/account/reset/x".to_owned(),
        );
        assert!(TracingMailer.send_password_reset(&mail).await.is_ok());
    }
}
