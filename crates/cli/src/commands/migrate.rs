//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! rr-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/catalog/migrations/` and are embedded at
//! compile time.

use tracing::info;

use raving_reviews_catalog::{CatalogConfig, db};

/// Run catalog database migrations.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is unreachable,
/// or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CatalogConfig::from_env()?;

    info!("Connecting to catalog database...");
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;

    info!("Running catalog migrations...");
    db::migrate(&pool).await?;

    info!("Catalog migrations complete!");
    Ok(())
}
