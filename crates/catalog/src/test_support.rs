//! Test doubles for the catalog's collaborators.
//!
//! Compiled for unit tests and, through the `test-support` feature, for the
//! integration-tests crate.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::mail::{MailError, Mailer, PasswordResetMail};
use crate::models::User;
use crate::session::{CurrentUser, SessionError, SessionIssuer};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A fixed instant used as "now" by default in tests: 2024-06-01T12:00:00Z.
#[must_use]
pub fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// A clock that stays put until told to move.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Default for MutableClock {
    fn default() -> Self {
        Self::new(fixture_now())
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Records every reset mail; can be told to fail instead.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<PasswordResetMail>>,
    fail: Mutex<bool>,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails with a transport error.
    #[must_use]
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.set_failing(true);
        mailer
    }

    pub fn set_failing(&self, fail: bool) {
        *lock(&self.fail) = fail;
    }

    /// Mails sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<PasswordResetMail> {
        lock(&self.sent).clone()
    }

    /// The token at the end of the most recent reset URL.
    #[must_use]
    pub fn last_token(&self) -> Option<String> {
        lock(&self.sent)
            .last()
            .and_then(|m| m.reset_url.rsplit('/').next().map(str::to_owned))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(&self, mail: &PasswordResetMail) -> Result<(), MailError> {
        if *lock(&self.fail) {
            return Err(MailError::Transport("connection refused".to_owned()));
        }
        lock(&self.sent).push(mail.clone());
        Ok(())
    }
}

/// Records every session it establishes; can be told to fail instead.
#[derive(Default)]
pub struct RecordingSessionIssuer {
    issued: Mutex<Vec<CurrentUser>>,
    fail: Mutex<bool>,
}

impl RecordingSessionIssuer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        *lock(&self.fail) = fail;
    }

    #[must_use]
    pub fn issued(&self) -> Vec<CurrentUser> {
        lock(&self.issued).clone()
    }
}

#[async_trait]
impl SessionIssuer for RecordingSessionIssuer {
    async fn establish(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<CurrentUser, SessionError> {
        if *lock(&self.fail) {
            return Err(SessionError::Store("session store unavailable".to_owned()));
        }
        let session = CurrentUser {
            id: user.id,
            email: user.email.clone(),
            logged_in_at: now,
        };
        lock(&self.issued).push(session.clone());
        Ok(session)
    }
}
