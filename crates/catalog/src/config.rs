//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `CATALOG_BASE_URL` - Public URL used to build password-reset links
//!
//! ## Optional
//! - `CATALOG_UNKNOWN_EMAIL_POLICY` - `conceal` (default) or `disclose`
//! - `CATALOG_RESET_TOKEN_TTL_SECS` - Reset token lifetime (default: 3600)
//! - `CATALOG_SLUG_RETRY_LIMIT` - Attempts before a slug conflict is surfaced (default: 5)
//! - `CATALOG_DB_MAX_CONNECTIONS` - Pool size (default: 10)

use std::str::FromStr;

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default lifetime of a password-reset token.
pub const DEFAULT_RESET_TOKEN_TTL_SECS: i64 = 3600;

/// Longest accepted reset token lifetime: thirty days.
pub const MAX_RESET_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

/// Default number of insert attempts when slugs collide.
pub const DEFAULT_SLUG_RETRY_LIMIT: u32 = 5;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How a reset request for an unregistered email is reported.
///
/// `Conceal` answers exactly as if a reset email had been sent, so the
/// response cannot be used to probe which addresses have accounts.
/// `Disclose` reports the missing account, trading privacy for usability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownEmailPolicy {
    #[default]
    Conceal,
    Disclose,
}

impl FromStr for UnknownEmailPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conceal" => Ok(Self::Conceal),
            "disclose" => Ok(Self::Disclose),
            other => Err(format!("expected `conceal` or `disclose`, got `{other}`")),
        }
    }
}

/// Behavioural settings shared by the catalog services.
///
/// Holds no secrets, so it is safe to log.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// Public base URL; reset links are `{base_url}/account/reset/{token}`
    pub base_url: Url,
    /// Response policy for reset requests naming unknown emails
    pub unknown_email_policy: UnknownEmailPolicy,
    /// How long an issued reset token stays valid
    pub reset_token_ttl: TimeDelta,
    /// Insert attempts before a slug collision is reported as a conflict
    pub slug_retry_limit: u32,
}

impl CatalogSettings {
    /// Settings with defaults for everything but the base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            unknown_email_policy: UnknownEmailPolicy::default(),
            reset_token_ttl: TimeDelta::seconds(DEFAULT_RESET_TOKEN_TTL_SECS),
            slug_retry_limit: DEFAULT_SLUG_RETRY_LIMIT,
        }
    }

    /// Build the link mailed to a user for a given reset token.
    #[must_use]
    pub fn reset_url(&self, token: &str) -> String {
        format!(
            "{}/account/reset/{token}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

/// Full catalog configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// Service behaviour settings
    pub settings: CatalogSettings,
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CATALOG_DATABASE_URL")?;
        let max_connections = parse_env_or_default("CATALOG_DB_MAX_CONNECTIONS", 10_u32)?;
        let settings = CatalogSettings::from_env()?;

        Ok(Self {
            database_url,
            max_connections,
            settings,
        })
    }
}

impl CatalogSettings {
    /// Load only the service settings (no database URL needed).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `CATALOG_BASE_URL` is missing or any optional
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("CATALOG_BASE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CATALOG_BASE_URL".to_string(), e.to_string())
        })?;

        let unknown_email_policy =
            parse_env_or_default("CATALOG_UNKNOWN_EMAIL_POLICY", UnknownEmailPolicy::Conceal)?;
        let reset_token_ttl = reset_token_ttl(parse_env_or_default(
            "CATALOG_RESET_TOKEN_TTL_SECS",
            DEFAULT_RESET_TOKEN_TTL_SECS,
        )?)?;
        let slug_retry_limit =
            parse_env_or_default("CATALOG_SLUG_RETRY_LIMIT", DEFAULT_SLUG_RETRY_LIMIT)?.max(1);

        Ok(Self {
            base_url,
            unknown_email_policy,
            reset_token_ttl,
            slug_retry_limit,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Bound-check a reset token lifetime given in seconds.
fn reset_token_ttl(secs: i64) -> Result<TimeDelta, ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::InvalidEnvVar("CATALOG_RESET_TOKEN_TTL_SECS".to_string(), reason.to_string())
    };
    if secs <= 0 {
        return Err(invalid("must be positive"));
    }
    if secs > MAX_RESET_TOKEN_TTL_SECS {
        return Err(invalid("must be at most thirty days"));
    }
    TimeDelta::try_seconds(secs).ok_or_else(|| invalid("out of range"))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
