//! Store domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use raving_reviews_core::{GeoPoint, Location, Slug, StoreId, UserId};

use super::review::Review;
use super::user::AuthorSummary;
use crate::error::ValidationErrors;

/// A catalog store (domain type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Unique URL-safe identifier derived from the name.
    pub slug: Slug,
    /// Display name, trimmed and non-empty.
    pub name: String,
    /// Optional trimmed description.
    pub description: Option<String>,
    /// Tags in display order, without duplicates.
    pub tags: Vec<String>,
    /// When the store was submitted.
    pub created: DateTime<Utc>,
    /// Where the store is.
    pub location: Location,
    /// Filename of the resized photo, if one was uploaded.
    pub photo: Option<String>,
    /// User who submitted the store.
    pub author: UserId,
}

impl Store {
    /// Returns true if `user` submitted this store.
    #[must_use]
    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author == user
    }

    /// Returns true if this store carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Raw store form input, as collected by the request layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    /// Filename handed over by the image-storage collaborator.
    #[serde(default)]
    pub photo: Option<String>,
}

/// Store fields that passed validation, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDraft {
    pub name: String,
    /// Base slug for `name`, before any uniqueness suffix.
    pub base_slug: Slug,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    pub photo: Option<String>,
}

impl StoreInput {
    /// Validate and normalize the input.
    ///
    /// All failing fields are reported at once.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] naming every invalid field.
    pub fn validate(&self) -> Result<StoreDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self.name.trim().to_owned();
        let base_slug = if name.is_empty() {
            errors.add("name", "Please enter a store name!");
            None
        } else {
            match Slug::from_name(&name) {
                Ok(slug) => Some(slug),
                Err(_) => {
                    errors.add("name", "Name must contain at least one letter or digit");
                    None
                }
            }
        };

        let address = trimmed(self.address.as_deref());
        if address.is_none() {
            errors.add("location.address", "You must supply an address!");
        }

        let point = match (self.lng, self.lat) {
            (Some(lng), Some(lat)) => match GeoPoint::new(lng, lat) {
                Ok(point) => Some(point),
                Err(e) => {
                    errors.add("location.coordinates", e.to_string());
                    None
                }
            },
            _ => {
                errors.add("location.coordinates", "You must supply coordinates!");
                None
            }
        };

        let photo = trimmed(self.photo.as_deref());
        if photo
            .as_deref()
            .is_some_and(|p| p.contains('/') || p.contains('\\'))
        {
            errors.add("photo", "Photo must be a bare filename");
        }

        match (base_slug, address, point) {
            (Some(base_slug), Some(address), Some(point)) if errors.is_empty() => Ok(StoreDraft {
                name,
                base_slug,
                description: trimmed(self.description.as_deref()),
                tags: normalize_tags(&self.tags),
                location: Location { point, address },
                photo,
            }),
            _ => Err(errors),
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Trim tags, drop blanks and keep the first occurrence of each.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|existing| existing == tag) {
            out.push(tag.to_owned());
        }
    }
    out
}

/// A lexical search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredStore {
    pub store: Store,
    /// Text relevance; higher is better.
    pub score: f32,
}

/// The reduced projection returned by proximity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStore {
    pub slug: Slug,
    pub name: String,
    pub description: Option<String>,
    pub location: Location,
    pub photo: Option<String>,
    /// Great-circle distance from the query point.
    pub distance_metres: f64,
}

impl NearbyStore {
    /// Project a store for the map, given its distance from the query point.
    #[must_use]
    pub fn from_store(store: Store, distance_metres: f64) -> Self {
        Self {
            slug: store.slug,
            name: store.name,
            description: store.description,
            location: store.location,
            photo: store.photo,
            distance_metres,
        }
    }
}

/// A tag and how many stores use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Result of a tag lookup: the tag cloud plus the matching stores.
#[derive(Debug, Clone, Serialize)]
pub struct TagListing {
    /// All tags in use, ascending by count.
    pub tags: Vec<TagCount>,
    /// Tag that was asked for, if any.
    pub selected: Option<String>,
    pub stores: Vec<Store>,
}

/// One page of the newest-first store listing.
#[derive(Debug, Clone, Serialize)]
pub struct StorePage {
    pub stores: Vec<Store>,
    /// 1-based page number.
    pub page: u32,
    /// Total number of pages (at least 1).
    pub pages: u32,
    /// Total number of stores.
    pub count: u64,
}

/// A store with its author and reviews joined in.
#[derive(Debug, Clone, Serialize)]
pub struct StoreDetail {
    pub store: Store,
    pub author: Option<AuthorSummary>,
    pub reviews: Vec<Review>,
}

/// A store in the top-rated ranking.
#[derive(Debug, Clone, Serialize)]
pub struct RankedStore {
    pub store: Store,
    pub average_rating: f64,
    pub reviews: Vec<Review>,
}
