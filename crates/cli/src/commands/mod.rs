//! CLI subcommands.

pub mod migrate;
pub mod query;
pub mod seed;
