//! Reconciliation engine.
//!
//! Merges one platform entity at a time into the store under the tenant's
//! natural keys. Both ingestion paths go through here; they differ only in
//! the [`ReconcileOptions`] they pass:
//!
//! | Path       | Missing references          | Paid-order credit |
//! |------------|-----------------------------|-------------------|
//! | Full sync  | looked up, left unlinked    | never             |
//! | Webhook    | created (contact / stub)    | first paid write  |
//!
//! Customer and product reconciliation overwrite the stored snapshot, so
//! replaying the same payload is a no-op. Order reconciliation replaces the
//! header and the full item set in one atomic store write.

mod mapping;

pub use mapping::slugify_handle;

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use shop_insights_core::{ProductId, ResourceType, TenantId};

use crate::db::{RepositoryError, Store};
use crate::models::{
    Customer, CustomerCredit, OrderItemRecord, OrderWrite, Product, ReplacedOrder,
};
use crate::shopify::{
    ShopifyCustomer, ShopifyLineItem, ShopifyOrder, ShopifyOrderCustomer, ShopifyProduct,
};

/// Errors from reconciling a single entity.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The payload could not be mapped (bad shape, missing required field).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The store rejected a read or write.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

/// How an order's customer and product references are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Link only to entities already stored; leave unmatched references empty.
    LookupOnly,
    /// Create missing entities from the data embedded in the order.
    CreateIfMissing,
}

/// Caller-chosen behavior for order reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub references: ReferencePolicy,
    /// Credit the customer's spend and order count when the order is paid
    /// and was not already stored as paid.
    pub credit_paid_orders: bool,
}

impl ReconcileOptions {
    /// Pull path: never fabricate entities, leave aggregates to the
    /// platform snapshot.
    #[must_use]
    pub const fn full_sync() -> Self {
        Self {
            references: ReferencePolicy::LookupOnly,
            credit_paid_orders: false,
        }
    }

    /// Push path: create what the event references, credit paid orders.
    #[must_use]
    pub const fn webhook() -> Self {
        Self {
            references: ReferencePolicy::CreateIfMissing,
            credit_paid_orders: true,
        }
    }
}

/// What a reconciliation wrote.
#[derive(Debug, Clone)]
pub enum Reconciled {
    Customer(Customer),
    Product(Product),
    Order(ReplacedOrder),
}

/// The reconciliation engine.
///
/// Cheap to clone; all state lives in the store.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn Store>,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Create or overwrite a customer from its platform snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Repository` if the store write fails.
    #[instrument(skip(self, payload), fields(tenant_id = %tenant, external_id = %payload.id))]
    pub async fn reconcile_customer(
        &self,
        tenant: TenantId,
        payload: &ShopifyCustomer,
    ) -> Result<Customer, ReconcileError> {
        let record = mapping::customer_record(payload);
        Ok(self.store.upsert_customer(tenant, &record).await?)
    }

    /// Create or overwrite a product from its platform snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidPayload` for a product without a title
    /// and `ReconcileError::Repository` if the store write fails.
    #[instrument(skip(self, payload), fields(tenant_id = %tenant, external_id = %payload.id))]
    pub async fn reconcile_product(
        &self,
        tenant: TenantId,
        payload: &ShopifyProduct,
    ) -> Result<Product, ReconcileError> {
        let record = mapping::product_record(payload)?;
        Ok(self.store.upsert_product(tenant, &record).await?)
    }

    /// Reconcile an order header and replace its items.
    ///
    /// References are resolved first (per `options.references`); the header
    /// upsert, item replace and optional customer credit are then written as
    /// one atomic unit. Every line item must map, otherwise nothing is
    /// written for the order.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidPayload` if any line item is invalid
    /// and `ReconcileError::Repository` if a store read or write fails.
    #[instrument(
        skip(self, payload),
        fields(tenant_id = %tenant, external_id = %payload.id, items = payload.line_items.len())
    )]
    pub async fn reconcile_order(
        &self,
        tenant: TenantId,
        payload: &ShopifyOrder,
        options: ReconcileOptions,
    ) -> Result<ReplacedOrder, ReconcileError> {
        let customer = self
            .resolve_customer(tenant, payload.customer.as_ref(), options.references)
            .await?;

        let mut items = Vec::with_capacity(payload.line_items.len());
        for line in &payload.line_items {
            items.push(
                self.reconcile_order_item(tenant, line, options.references)
                    .await?,
            );
        }

        let order = mapping::order_record(payload, customer.as_ref().map(|c| c.id));

        let credit = match &customer {
            Some(customer) if options.credit_paid_orders && order.is_paid() => {
                Some(CustomerCredit {
                    customer_id: customer.id,
                    amount: order.total_price,
                })
            }
            _ => None,
        };

        let replaced = self
            .store
            .replace_order(
                tenant,
                &OrderWrite {
                    order,
                    items,
                    credit,
                },
            )
            .await?;

        if replaced.credited {
            tracing::info!(
                customer_id = ?replaced.order.customer_id,
                amount = %replaced.order.total_price,
                "Credited customer for paid order"
            );
        }

        Ok(replaced)
    }

    /// Resolve an order's embedded customer to a stored customer.
    async fn resolve_customer(
        &self,
        tenant: TenantId,
        fragment: Option<&ShopifyOrderCustomer>,
        policy: ReferencePolicy,
    ) -> Result<Option<Customer>, ReconcileError> {
        let Some(contact) = fragment.and_then(mapping::customer_contact) else {
            return Ok(None);
        };

        let customer = match policy {
            ReferencePolicy::LookupOnly => {
                self.store
                    .find_customer(tenant, &contact.external_id)
                    .await?
            }
            ReferencePolicy::CreateIfMissing => {
                Some(self.store.upsert_customer_contact(tenant, &contact).await?)
            }
        };

        if customer.is_none() {
            tracing::debug!(
                customer_external_id = %contact.external_id,
                "Order customer not synced yet; leaving link unchanged"
            );
        }

        Ok(customer)
    }

    /// Resolve a line item's product to a stored product.
    async fn resolve_product(
        &self,
        tenant: TenantId,
        line: &ShopifyLineItem,
        policy: ReferencePolicy,
    ) -> Result<Option<ProductId>, ReconcileError> {
        let Some(external_id) = &line.product_id else {
            return Ok(None);
        };

        let product = match policy {
            ReferencePolicy::LookupOnly => self.store.find_product(tenant, external_id).await?,
            ReferencePolicy::CreateIfMissing => {
                let stub = mapping::product_stub(line, external_id)?;
                Some(self.store.insert_product_stub(tenant, &stub).await?)
            }
        };

        Ok(product.map(|p| p.id))
    }

    /// Map one line item, resolving its product reference.
    async fn reconcile_order_item(
        &self,
        tenant: TenantId,
        line: &ShopifyLineItem,
        policy: ReferencePolicy,
    ) -> Result<OrderItemRecord, ReconcileError> {
        let product_id = self.resolve_product(tenant, line, policy).await?;
        mapping::order_item_record(line, product_id)
    }

    /// Parse a raw platform item of `resource` and reconcile it.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidPayload` if the item does not match the
    /// resource's shape, otherwise whatever the typed operation returns.
    pub async fn reconcile_raw(
        &self,
        tenant: TenantId,
        resource: ResourceType,
        item: serde_json::Value,
        options: ReconcileOptions,
    ) -> Result<Reconciled, ReconcileError> {
        match resource {
            ResourceType::Customers => {
                let payload: ShopifyCustomer = serde_json::from_value(item)?;
                self.reconcile_customer(tenant, &payload)
                    .await
                    .map(Reconciled::Customer)
            }
            ResourceType::Products => {
                let payload: ShopifyProduct = serde_json::from_value(item)?;
                self.reconcile_product(tenant, &payload)
                    .await
                    .map(Reconciled::Product)
            }
            ResourceType::Orders => {
                let payload: ShopifyOrder = serde_json::from_value(item)?;
                self.reconcile_order(tenant, &payload, options)
                    .await
                    .map(Reconciled::Order)
            }
        }
    }
}
