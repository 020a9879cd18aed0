//! Catalog state shared across requests.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use sqlx::PgPool;

use crate::config::CatalogSettings;
use crate::db::PgCatalog;
use crate::mail::{Mailer, TracingMailer};
use crate::memory::MemoryCatalog;
use crate::ports::{RepositoryError, ReviewRepository, StoreRepository, UserRepository};
use crate::services::{
    AccountService, FavoritesService, PasswordResetService, RatingService, SearchService,
    SlugGenerator, StoreService,
};
use crate::session::{SessionIssuer, StatelessSessionIssuer};

/// Entry point to every catalog operation.
///
/// This struct is cheaply cloneable via `Arc`. Each accessor hands out a
/// service that borrows the shared collaborators for one call.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    stores: Arc<dyn StoreRepository>,
    reviews: Arc<dyn ReviewRepository>,
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    sessions: Arc<dyn SessionIssuer>,
    clock: Arc<dyn Clock>,
    settings: CatalogSettings,
}

impl Catalog {
    /// Start building a catalog over one backend implementing every port.
    pub fn builder<B>(backend: Arc<B>, settings: CatalogSettings) -> CatalogBuilder
    where
        B: StoreRepository + ReviewRepository + UserRepository + 'static,
    {
        CatalogBuilder {
            stores: backend.clone(),
            reviews: backend.clone(),
            users: backend,
            mailer: Arc::new(TracingMailer),
            sessions: Arc::new(StatelessSessionIssuer),
            clock: Arc::new(DefaultClock),
            settings,
        }
    }

    /// A catalog backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool, settings: CatalogSettings) -> Self {
        Self::builder(Arc::new(PgCatalog::new(pool)), settings).build()
    }

    /// An empty in-memory catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the search index cannot be created.
    pub fn in_memory(settings: CatalogSettings) -> Result<Self, RepositoryError> {
        Ok(Self::builder(Arc::new(MemoryCatalog::new()?), settings).build())
    }

    /// Get a reference to the service settings.
    #[must_use]
    pub fn settings(&self) -> &CatalogSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn slugs(&self) -> SlugGenerator<'_> {
        SlugGenerator::new(self.inner.stores.as_ref())
    }

    #[must_use]
    pub fn stores(&self) -> StoreService<'_> {
        StoreService::new(
            self.inner.stores.as_ref(),
            self.inner.reviews.as_ref(),
            self.inner.users.as_ref(),
            self.inner.clock.as_ref(),
            &self.inner.settings,
        )
    }

    #[must_use]
    pub fn search(&self) -> SearchService<'_> {
        SearchService::new(self.inner.stores.as_ref())
    }

    #[must_use]
    pub fn ratings(&self) -> RatingService<'_> {
        RatingService::new(self.inner.reviews.as_ref(), self.inner.clock.as_ref())
    }

    #[must_use]
    pub fn favorites(&self) -> FavoritesService<'_> {
        FavoritesService::new(self.inner.users.as_ref(), self.inner.stores.as_ref())
    }

    #[must_use]
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(self.inner.users.as_ref(), self.inner.clock.as_ref())
    }

    #[must_use]
    pub fn password_reset(&self) -> PasswordResetService<'_> {
        PasswordResetService::new(
            self.inner.users.as_ref(),
            self.inner.mailer.as_ref(),
            self.inner.sessions.as_ref(),
            self.inner.clock.as_ref(),
            &self.inner.settings,
        )
    }
}

/// Builder for [`Catalog`]; collaborators default to the log-only mailer,
/// the stateless session issuer and the system clock.
pub struct CatalogBuilder {
    stores: Arc<dyn StoreRepository>,
    reviews: Arc<dyn ReviewRepository>,
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    sessions: Arc<dyn SessionIssuer>,
    clock: Arc<dyn Clock>,
    settings: CatalogSettings,
}

impl CatalogBuilder {
    /// Replace the store repository (e.g. with a wrapper).
    #[must_use]
    pub fn stores(mut self, stores: Arc<dyn StoreRepository>) -> Self {
        self.stores = stores;
        self
    }

    #[must_use]
    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    #[must_use]
    pub fn sessions(mut self, sessions: Arc<dyn SessionIssuer>) -> Self {
        self.sessions = sessions;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn build(self) -> Catalog {
        Catalog {
            inner: Arc::new(CatalogInner {
                stores: self.stores,
                reviews: self.reviews,
                users: self.users,
                mailer: self.mailer,
                sessions: self.sessions,
                clock: self.clock,
                settings: self.settings,
            }),
        }
    }
}
