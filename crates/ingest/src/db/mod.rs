//! Persistence for ingested data.
//!
//! # Database: `shop_insights` (schema `ingest`)
//!
//! ## Tables
//!
//! - `tenant` - Tenants, their shop domain and platform credentials
//! - `customer` - Customers, unique per `(tenant_id, external_id)`
//! - `product` - Products, unique per `(tenant_id, external_id)`
//! - `sales_order` - Order headers, unique per `(tenant_id, external_id)`
//! - `sales_order_item` - Order lines (replaced wholesale on every order write)
//! - `webhook_delivery` - Processed webhook deliveries, for redelivery dedupe
//!
//! # Migrations
//!
//! Migrations are stored in `crates/ingest/migrations/` and run via:
//! ```bash
//! cargo run -p shop-insights-cli -- migrate
//! ```
//!
//! # Store seam
//!
//! All reads and writes go through the [`Store`] trait so the reconciliation
//! engine never depends on a concrete database. [`PgStore`] is the production
//! implementation; `MemoryStore` (tests and the `testing` feature) keeps the
//! same uniqueness and atomicity guarantees in process.

#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shop_insights_core::{ExternalId, OrderId, ShopDomain, TenantId};

use crate::models::{
    Customer, CustomerContact, CustomerRecord, NewTenant, Order, OrderItem, OrderWrite, Product,
    ProductRecord, ProductStub, ReplacedOrder, Tenant, TenantCredentials,
};

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate shop domain).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Tenant-scoped relational storage for ingested entities.
///
/// Every entity operation takes the owning tenant and matches on it, so an
/// external id that exists for another tenant is never read or written.
/// Upserts are atomic per natural key; [`Store::replace_order`] is atomic as
/// a whole.
#[async_trait]
pub trait Store: Send + Sync {
    // -------------------------------------------------------------------------
    // Tenants
    // -------------------------------------------------------------------------

    /// Onboard a tenant.
    ///
    /// Returns `RepositoryError::Conflict` if the shop domain is taken.
    async fn create_tenant(&self, tenant: &NewTenant) -> Result<Tenant, RepositoryError>;

    /// Update a tenant's credentials; `None` fields are left unchanged.
    ///
    /// Returns `RepositoryError::NotFound` if the tenant does not exist.
    async fn update_tenant_credentials(
        &self,
        id: TenantId,
        credentials: &TenantCredentials,
    ) -> Result<Tenant, RepositoryError>;

    async fn tenant_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError>;

    async fn tenant_by_domain(&self, domain: &ShopDomain)
    -> Result<Option<Tenant>, RepositoryError>;

    async fn list_tenants(&self) -> Result<Vec<Tenant>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    async fn find_customer(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Customer>, RepositoryError>;

    /// Create or fully overwrite a customer snapshot.
    async fn upsert_customer(
        &self,
        tenant: TenantId,
        record: &CustomerRecord,
    ) -> Result<Customer, RepositoryError>;

    /// Create a customer from contact fields, or update only the contact
    /// fields of an existing one.
    async fn upsert_customer_contact(
        &self,
        tenant: TenantId,
        contact: &CustomerContact,
    ) -> Result<Customer, RepositoryError>;

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    async fn find_product(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Create or fully overwrite a product snapshot.
    async fn upsert_product(
        &self,
        tenant: TenantId,
        record: &ProductRecord,
    ) -> Result<Product, RepositoryError>;

    /// Insert a stub product unless one with the same external id exists.
    /// Returns whichever row is stored afterwards.
    async fn insert_product_stub(
        &self,
        tenant: TenantId,
        stub: &ProductStub,
    ) -> Result<Product, RepositoryError>;

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    async fn find_order(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Items of an order, in insertion order.
    async fn order_items(
        &self,
        tenant: TenantId,
        order: OrderId,
    ) -> Result<Vec<OrderItem>, RepositoryError>;

    /// Atomically upsert the header, delete all existing items, recreate the
    /// supplied items and apply the customer credit if the order was not
    /// already paid.
    async fn replace_order(
        &self,
        tenant: TenantId,
        write: &OrderWrite,
    ) -> Result<ReplacedOrder, RepositoryError>;

    // -------------------------------------------------------------------------
    // Webhook deliveries
    // -------------------------------------------------------------------------

    /// Whether a webhook delivery id was already processed for the tenant.
    async fn webhook_processed(
        &self,
        tenant: TenantId,
        webhook_id: &str,
    ) -> Result<bool, RepositoryError>;

    /// Record a processed webhook delivery. Recording twice is a no-op.
    async fn record_webhook(
        &self,
        tenant: TenantId,
        webhook_id: &str,
        topic: &str,
    ) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
