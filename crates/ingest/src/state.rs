//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::IngestConfig;
use crate::db::{PgStore, Store};
use crate::reconcile::Reconciler;
use crate::shopify::{PageSource, ShopifyClient, ShopifyError};
use crate::sync::FullSync;
use crate::webhooks::WebhookDispatcher;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: IngestConfig,
    pool: Option<PgPool>,
    reconciler: Reconciler,
    webhooks: WebhookDispatcher,
    sync: FullSync,
}

impl AppState {
    /// Build production state over a `PostgreSQL` pool and the Shopify client.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: IngestConfig, pool: PgPool) -> Result<Self, ShopifyError> {
        let shopify = ShopifyClient::new(&config.shopify)?;
        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
        Ok(Self::build(config, Some(pool), store, Arc::new(shopify)))
    }

    /// Build state from an arbitrary store and page source.
    #[must_use]
    pub fn from_parts(
        config: IngestConfig,
        store: Arc<dyn Store>,
        source: Arc<dyn PageSource>,
    ) -> Self {
        Self::build(config, None, store, source)
    }

    fn build(
        config: IngestConfig,
        pool: Option<PgPool>,
        store: Arc<dyn Store>,
        source: Arc<dyn PageSource>,
    ) -> Self {
        let reconciler = Reconciler::new(store);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                webhooks: WebhookDispatcher::new(reconciler.clone()),
                sync: FullSync::new(source, reconciler.clone()),
                reconciler,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &IngestConfig {
        &self.inner.config
    }

    /// Database pool, when backed by `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        self.inner.reconciler.store()
    }

    #[must_use]
    pub fn webhooks(&self) -> &WebhookDispatcher {
        &self.inner.webhooks
    }

    #[must_use]
    pub fn sync(&self) -> &FullSync {
        &self.inner.sync
    }
}
