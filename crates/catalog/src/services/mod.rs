//! Catalog services.
//!
//! Each service borrows the ports it needs for the duration of one call;
//! none of them keep state between requests.

pub mod accounts;
pub mod favorites;
pub mod password;
pub mod password_reset;
pub mod ratings;
pub mod search;
pub mod slugs;
pub mod stores;

pub use accounts::AccountService;
pub use favorites::FavoritesService;
pub use password_reset::PasswordResetService;
pub use ratings::RatingService;
pub use search::SearchService;
pub use slugs::SlugGenerator;
pub use stores::StoreService;
