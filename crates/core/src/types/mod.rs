//! Core types for Raving Reviews.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod rating;
pub mod slug;

pub use email::{Email, EmailError};
pub use geo::{GeoError, GeoPoint, Location};
pub use id::*;
pub use rating::{Rating, RatingError};
pub use slug::{Slug, SlugError};
