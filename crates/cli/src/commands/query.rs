//! Read-only catalog queries printed as JSON.
//!
//! Queries run against `PostgreSQL` by default. With `--offline <seed.json>`
//! they run against an in-memory catalog loaded from the seed file, which
//! needs only `CATALOG_BASE_URL` (or nothing; it defaults to localhost).

use std::path::Path;

use serde::Serialize;
use tracing::info;
use url::Url;

use raving_reviews_catalog::{Catalog, CatalogConfig, CatalogSettings, db};

use super::seed;

const OFFLINE_BASE_URL: &str = "http://localhost:3000";

/// Open the catalog the query should run against.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is
/// unreachable, or the offline seed file fails to load.
pub async fn open(offline: Option<&Path>) -> Result<Catalog, Box<dyn std::error::Error>> {
    let Some(path) = offline else {
        let config = CatalogConfig::from_env()?;
        let pool = db::create_pool(&config.database_url, config.max_connections).await?;
        return Ok(Catalog::postgres(pool, config.settings));
    };

    let settings = match CatalogSettings::from_env() {
        Ok(settings) => settings,
        Err(_) => CatalogSettings::new(Url::parse(OFFLINE_BASE_URL)?),
    };
    let catalog = Catalog::in_memory(settings)?;
    let report = seed::load(&catalog, &seed::read(path).await?).await?;
    info!(stores = report.stores, "Offline catalog ready");
    Ok(catalog)
}

/// `search <query>`
///
/// # Errors
///
/// Returns an error if the search backend fails.
pub async fn search(catalog: &Catalog, query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let hits = catalog.search().search_by_text(query).await?;
    print_json(&hits)
}

/// `near <lng> <lat>`
///
/// # Errors
///
/// Returns an error for unparseable coordinates or a backend failure.
pub async fn near(
    catalog: &Catalog,
    lng: &str,
    lat: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let stores = catalog.search().search_near(Some(lng), Some(lat)).await?;
    print_json(&stores)
}

/// `tags [tag]`
///
/// # Errors
///
/// Returns an error if the backend fails.
pub async fn tags(catalog: &Catalog, tag: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let listing = catalog.search().list_by_tag(tag).await?;
    print_json(&listing)
}

/// `top`
///
/// # Errors
///
/// Returns an error if the backend fails.
pub async fn top(catalog: &Catalog) -> Result<(), Box<dyn std::error::Error>> {
    let ranked = catalog.ratings().top_stores().await?;
    print_json(&ranked)
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
