//! Domain models for the catalog.

pub mod review;
pub mod store;
pub mod user;

pub use review::{
    MIN_REVIEWS_FOR_RANKING, NewReview, RatingSummary, Review, TOP_STORES_LIMIT, rank_by_average,
};
pub use store::{
    NearbyStore, RankedStore, ScoredStore, Store, StoreDetail, StoreDraft, StoreInput, StorePage,
    TagCount, TagListing, normalize_tags,
};
pub use user::{AuthorSummary, HeartToggle, NewUser, PendingReset, User};
