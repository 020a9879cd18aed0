//! Raving Reviews catalog data engine.
//!
//! Stores places ("stores"), finds them by text relevance, proximity or tag,
//! ranks them by their reviews, keeps per-user favorites, and runs the
//! password-reset token lifecycle.
//!
//! # Layout
//!
//! - [`ports`] - Repository traits the services depend on
//! - [`db`] - `PostgreSQL` + PostGIS implementation of the ports
//! - [`memory`] - In-process implementation backed by a Tantivy index
//! - [`services`] - The catalog operations
//! - [`state`] - [`Catalog`], the shared entry point wiring it all together
//!
//! # Example
//!
//! ```rust,ignore
//! use raving_reviews_catalog::{Catalog, CatalogConfig, db};
//!
//! let config = CatalogConfig::from_env()?;
//! let pool = db::create_pool(&config.database_url, config.max_connections).await?;
//! let catalog = Catalog::postgres(pool, config.settings);
//!
//! let hits = catalog.search().search_by_text("coffee").await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod mail;
pub mod memory;
pub mod models;
pub mod ports;
pub mod services;
pub mod session;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{CatalogConfig, CatalogSettings, ConfigError, UnknownEmailPolicy};
pub use error::{CatalogError, FieldError, ValidationErrors};
pub use state::{Catalog, CatalogBuilder};
