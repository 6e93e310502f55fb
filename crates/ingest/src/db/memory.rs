//! In-process implementation of [`Store`] for tests.
//!
//! Mirrors the `PostgreSQL` semantics: natural-key upserts, tenant-scoped
//! lookups, and an all-or-nothing [`Store::replace_order`]. Every successful
//! write bumps a mutation counter so tests can assert that a rejected request
//! touched nothing.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use shop_insights_core::{
    CustomerId, ExternalId, OrderId, OrderItemId, ProductId, ShopDomain, TenantId,
};

use super::{RepositoryError, Store};
use crate::models::{
    Customer, CustomerContact, CustomerRecord, NewTenant, Order, OrderItem, OrderWrite, Product,
    ProductRecord, ProductStub, ReplacedOrder, Tenant, TenantCredentials,
};

#[derive(Debug, Default)]
struct Inner {
    next_id: i32,
    tenants: Vec<Tenant>,
    customers: Vec<Customer>,
    products: Vec<Product>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    deliveries: HashSet<(TenantId, String)>,
    mutations: usize,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn customer_mut(&mut self, tenant: TenantId, external_id: &ExternalId) -> Option<&mut Customer> {
        self.customers
            .iter_mut()
            .find(|c| c.tenant_id == tenant && &c.external_id == external_id)
    }

    fn product_mut(&mut self, tenant: TenantId, external_id: &ExternalId) -> Option<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.tenant_id == tenant && &p.external_id == external_id)
    }
}

/// In-memory store guarded by a single async mutex.
///
/// Holding the lock for a whole operation gives every method the atomicity
/// the `PostgreSQL` store gets from constraints and transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation.
    pub async fn mutation_count(&self) -> usize {
        self.inner.lock().await.mutations
    }

    /// All customers of a tenant.
    pub async fn customers(&self, tenant: TenantId) -> Vec<Customer> {
        let inner = self.inner.lock().await;
        inner
            .customers
            .iter()
            .filter(|c| c.tenant_id == tenant)
            .cloned()
            .collect()
    }

    /// All products of a tenant.
    pub async fn products(&self, tenant: TenantId) -> Vec<Product> {
        let inner = self.inner.lock().await;
        inner
            .products
            .iter()
            .filter(|p| p.tenant_id == tenant)
            .cloned()
            .collect()
    }

    /// All orders of a tenant.
    pub async fn orders(&self, tenant: TenantId) -> Vec<Order> {
        let inner = self.inner.lock().await;
        inner
            .orders
            .iter()
            .filter(|o| o.tenant_id == tenant)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_tenant(&self, tenant: &NewTenant) -> Result<Tenant, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner
            .tenants
            .iter()
            .any(|t| t.shop_domain == tenant.shop_domain)
        {
            return Err(RepositoryError::Conflict(
                "shop domain already registered".to_owned(),
            ));
        }

        let now = Utc::now();
        let created = Tenant {
            id: TenantId::new(inner.next_id()),
            name: tenant.name.clone(),
            shop_domain: tenant.shop_domain.clone(),
            access_token: tenant.access_token.clone(),
            webhook_secret: tenant.webhook_secret.clone(),
            allow_unverified_webhooks: tenant.allow_unverified_webhooks,
            created_at: now,
            updated_at: now,
        };
        inner.tenants.push(created.clone());
        inner.mutations += 1;
        Ok(created)
    }

    async fn update_tenant_credentials(
        &self,
        id: TenantId,
        credentials: &TenantCredentials,
    ) -> Result<Tenant, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let tenant = inner
            .tenants
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(token) = &credentials.access_token {
            tenant.access_token = Some(token.clone());
        }
        if let Some(secret) = &credentials.webhook_secret {
            tenant.webhook_secret = Some(secret.clone());
        }
        if let Some(allow) = credentials.allow_unverified_webhooks {
            tenant.allow_unverified_webhooks = allow;
        }
        tenant.updated_at = Utc::now();

        let updated = tenant.clone();
        inner.mutations += 1;
        Ok(updated)
    }

    async fn tenant_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn tenant_by_domain(
        &self,
        domain: &ShopDomain,
    ) -> Result<Option<Tenant>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tenants
            .iter()
            .find(|t| &t.shop_domain == domain)
            .cloned())
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, RepositoryError> {
        Ok(self.inner.lock().await.tenants.clone())
    }

    async fn find_customer(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .customers
            .iter()
            .find(|c| c.tenant_id == tenant && &c.external_id == external_id)
            .cloned())
    }

    async fn upsert_customer(
        &self,
        tenant: TenantId,
        record: &CustomerRecord,
    ) -> Result<Customer, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let customer = if let Some(existing) = inner.customer_mut(tenant, &record.external_id) {
            existing.email.clone_from(&record.email);
            existing.first_name.clone_from(&record.first_name);
            existing.last_name.clone_from(&record.last_name);
            existing.phone.clone_from(&record.phone);
            existing.tags.clone_from(&record.tags);
            existing.total_spent = record.total_spent;
            existing.orders_count = record.orders_count;
            existing.updated_at = record.updated_at;
            existing.clone()
        } else {
            let created = Customer {
                id: CustomerId::new(inner.next_id()),
                tenant_id: tenant,
                external_id: record.external_id.clone(),
                email: record.email.clone(),
                first_name: record.first_name.clone(),
                last_name: record.last_name.clone(),
                phone: record.phone.clone(),
                tags: record.tags.clone(),
                total_spent: record.total_spent,
                orders_count: record.orders_count,
                created_at: record.created_at.unwrap_or_else(Utc::now),
                updated_at: record.updated_at,
            };
            inner.customers.push(created.clone());
            created
        };
        inner.mutations += 1;
        Ok(customer)
    }

    async fn upsert_customer_contact(
        &self,
        tenant: TenantId,
        contact: &CustomerContact,
    ) -> Result<Customer, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let customer = if let Some(existing) = inner.customer_mut(tenant, &contact.external_id) {
            if contact.email.is_some() {
                existing.email.clone_from(&contact.email);
            }
            if contact.first_name.is_some() {
                existing.first_name.clone_from(&contact.first_name);
            }
            if contact.last_name.is_some() {
                existing.last_name.clone_from(&contact.last_name);
            }
            if contact.phone.is_some() {
                existing.phone.clone_from(&contact.phone);
            }
            existing.clone()
        } else {
            let created = Customer {
                id: CustomerId::new(inner.next_id()),
                tenant_id: tenant,
                external_id: contact.external_id.clone(),
                email: contact.email.clone(),
                first_name: contact.first_name.clone(),
                last_name: contact.last_name.clone(),
                phone: contact.phone.clone(),
                tags: None,
                total_spent: Decimal::ZERO,
                orders_count: 0,
                created_at: Utc::now(),
                updated_at: None,
            };
            inner.customers.push(created.clone());
            created
        };
        inner.mutations += 1;
        Ok(customer)
    }

    async fn find_product(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Product>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .products
            .iter()
            .find(|p| p.tenant_id == tenant && &p.external_id == external_id)
            .cloned())
    }

    async fn upsert_product(
        &self,
        tenant: TenantId,
        record: &ProductRecord,
    ) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let product = if let Some(existing) = inner.product_mut(tenant, &record.external_id) {
            existing.title.clone_from(&record.title);
            existing.description.clone_from(&record.description);
            existing.handle.clone_from(&record.handle);
            existing.vendor.clone_from(&record.vendor);
            existing.product_type.clone_from(&record.product_type);
            existing.status.clone_from(&record.status);
            existing.tags.clone_from(&record.tags);
            existing.price = record.price;
            existing.compare_at_price = record.compare_at_price;
            existing.updated_at = record.updated_at;
            existing.clone()
        } else {
            let created = Product {
                id: ProductId::new(inner.next_id()),
                tenant_id: tenant,
                external_id: record.external_id.clone(),
                title: record.title.clone(),
                description: record.description.clone(),
                handle: record.handle.clone(),
                vendor: record.vendor.clone(),
                product_type: record.product_type.clone(),
                status: record.status.clone(),
                tags: record.tags.clone(),
                price: record.price,
                compare_at_price: record.compare_at_price,
                created_at: record.created_at.unwrap_or_else(Utc::now),
                updated_at: record.updated_at,
            };
            inner.products.push(created.clone());
            created
        };
        inner.mutations += 1;
        Ok(product)
    }

    async fn insert_product_stub(
        &self,
        tenant: TenantId,
        stub: &ProductStub,
    ) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.product_mut(tenant, &stub.external_id) {
            return Ok(existing.clone());
        }

        let created = Product {
            id: ProductId::new(inner.next_id()),
            tenant_id: tenant,
            external_id: stub.external_id.clone(),
            title: stub.title.clone(),
            description: None,
            handle: Some(stub.handle.clone()),
            vendor: stub.vendor.clone(),
            product_type: stub.product_type.clone(),
            status: None,
            tags: None,
            price: stub.price,
            compare_at_price: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.products.push(created.clone());
        inner.mutations += 1;
        Ok(created)
    }

    async fn find_order(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Order>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .iter()
            .find(|o| o.tenant_id == tenant && &o.external_id == external_id)
            .cloned())
    }

    async fn order_items(
        &self,
        tenant: TenantId,
        order: OrderId,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let inner = self.inner.lock().await;
        let owned = inner
            .orders
            .iter()
            .any(|o| o.id == order && o.tenant_id == tenant);
        if !owned {
            return Ok(Vec::new());
        }
        Ok(inner
            .items
            .iter()
            .filter(|i| i.order_id == order)
            .cloned()
            .collect())
    }

    async fn replace_order(
        &self,
        tenant: TenantId,
        write: &OrderWrite,
    ) -> Result<ReplacedOrder, RepositoryError> {
        let mut inner = self.inner.lock().await;
        let record = &write.order;

        let position = inner
            .orders
            .iter()
            .position(|o| o.tenant_id == tenant && o.external_id == record.external_id);
        let existed = position.is_some();
        let previously_paid = position
            .and_then(|i| inner.orders.get(i))
            .is_some_and(Order::is_paid);

        let (id, customer_id) = match position.and_then(|i| inner.orders.get(i)) {
            Some(existing) => (existing.id, record.customer_id.or(existing.customer_id)),
            None => (OrderId::new(inner.next_id()), record.customer_id),
        };

        let order = Order {
            id,
            tenant_id: tenant,
            external_id: record.external_id.clone(),
            customer_id,
            order_number: record.order_number.clone(),
            total_price: record.total_price,
            subtotal_price: record.subtotal_price,
            total_tax: record.total_tax,
            total_discounts: record.total_discounts,
            currency: record.currency.clone(),
            financial_status: record.financial_status.clone(),
            fulfillment_status: record.fulfillment_status.clone(),
            tags: record.tags.clone(),
            ordered_at: record.ordered_at,
            processed_at: record.processed_at,
            cancelled_at: record.cancelled_at,
            updated_at: record.updated_at,
        };

        match position.and_then(|i| inner.orders.get_mut(i)) {
            Some(slot) => *slot = order.clone(),
            None => inner.orders.push(order.clone()),
        }

        inner.items.retain(|i| i.order_id != id);
        let mut items = Vec::with_capacity(write.items.len());
        for item in &write.items {
            let stored = OrderItem {
                id: OrderItemId::new(inner.next_id()),
                order_id: id,
                product_id: item.product_id,
                external_line_item_id: item.external_line_item_id.clone(),
                title: item.title.clone(),
                quantity: item.quantity,
                price: item.price,
                total_discount: item.total_discount,
            };
            inner.items.push(stored.clone());
            items.push(stored);
        }

        let mut credited = false;
        if let Some(credit) = write.credit
            && record.is_paid()
            && !previously_paid
            && let Some(customer) = inner
                .customers
                .iter_mut()
                .find(|c| c.id == credit.customer_id && c.tenant_id == tenant)
        {
            customer.total_spent += credit.amount;
            customer.orders_count += 1;
            credited = true;
        }

        inner.mutations += 1;
        Ok(ReplacedOrder {
            order,
            items,
            existed,
            credited,
        })
    }

    async fn webhook_processed(
        &self,
        tenant: TenantId,
        webhook_id: &str,
    ) -> Result<bool, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.deliveries.contains(&(tenant, webhook_id.to_owned())))
    }

    async fn record_webhook(
        &self,
        tenant: TenantId,
        webhook_id: &str,
        _topic: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        if inner.deliveries.insert((tenant, webhook_id.to_owned())) {
            inner.mutations += 1;
        }
        Ok(())
    }
}
