//! Raving Reviews CLI - migrations, seeding and catalog queries.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rr-cli migrate
//!
//! # Load users, stores and reviews from a JSON file
//! rr-cli seed fixtures/stores.json
//!
//! # Query the catalog (prints JSON)
//! rr-cli search "coffee"
//! rr-cli near -- -79.38 43.65
//! rr-cli tags Wifi
//! rr-cli top
//!
//! # Query an in-memory catalog loaded from a seed file, no database needed
//! rr-cli --offline fixtures/stores.json search "coffee"
//! ```
//!
//! # Environment Variables
//!
//! See `raving_reviews_catalog::config`. `RUST_LOG` overrides the default
//! log filter (`raving_reviews_catalog=info,rr_cli=info`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "rr-cli")]
#[command(author, version, about = "Raving Reviews CLI tools")]
struct Cli {
    /// Serve queries from an in-memory catalog seeded from this file
    #[arg(long, global = true, value_name = "SEED_FILE")]
    offline: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load users, stores and reviews from a JSON seed file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },
    /// Stores matching a text query, best first
    Search {
        /// Free-text query
        query: String,
    },
    /// Stores within 10 km of a point, nearest first
    Near {
        /// Longitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lng: String,
        /// Latitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lat: String,
    },
    /// Tag counts and the stores carrying a tag
    Tags {
        /// Tag to filter by (all tagged stores when omitted)
        tag: Option<String>,
    },
    /// Top-rated stores
    Top,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("raving_reviews_catalog=info,rr_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Search { query } => {
            let catalog = commands::query::open(cli.offline.as_deref()).await?;
            commands::query::search(&catalog, &query).await?;
        }
        Commands::Near { lng, lat } => {
            let catalog = commands::query::open(cli.offline.as_deref()).await?;
            commands::query::near(&catalog, &lng, &lat).await?;
        }
        Commands::Tags { tag } => {
            let catalog = commands::query::open(cli.offline.as_deref()).await?;
            commands::query::tags(&catalog, tag.as_deref()).await?;
        }
        Commands::Top => {
            let catalog = commands::query::open(cli.offline.as_deref()).await?;
            commands::query::top(&catalog).await?;
        }
    }
    Ok(())
}
