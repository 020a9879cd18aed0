//! Raving Reviews Core - Shared types library.
//!
//! This crate provides the value types used across all Raving Reviews
//! components:
//! - `catalog` - The catalog data engine (stores, reviews, favorites, resets)
//! - `cli` - Command-line tools for migrations, seeding and queries
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access. Slug normalization and great-circle distance live here
//! because both the `PostgreSQL` adapter and the in-memory adapter need
//! exactly the same answers.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, slugs, ratings and geographic points

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
