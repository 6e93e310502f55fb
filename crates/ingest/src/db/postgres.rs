//! `PostgreSQL` implementation of [`Store`].
//!
//! Queries are runtime-checked (`sqlx::query_as` + `FromRow`) so the crate
//! builds without a live database. Natural-key uniqueness is enforced by the
//! `(tenant_id, external_id)` constraints and `ON CONFLICT` upserts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use shop_insights_core::{
    CustomerId, ExternalId, FinancialStatus, FulfillmentStatus, OrderId, OrderItemId, ProductId,
    ShopDomain, TenantId,
};

use super::{RepositoryError, Store};
use crate::models::{
    Customer, CustomerContact, CustomerRecord, NewTenant, Order, OrderItem, OrderItemRecord,
    OrderWrite, Product, ProductRecord, ProductStub, ReplacedOrder, Tenant, TenantCredentials,
};

// =============================================================================
// Internal Row Types
// =============================================================================

const TENANT_COLUMNS: &str = "id, name, shop_domain, access_token, webhook_secret, \
     allow_unverified_webhooks, created_at, updated_at";

const CUSTOMER_COLUMNS: &str = "id, tenant_id, external_id, email, first_name, last_name, \
     phone, tags, total_spent, orders_count, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, tenant_id, external_id, title, description, handle, vendor, \
     product_type, status, tags, price, compare_at_price, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, tenant_id, external_id, customer_id, order_number, total_price, \
     subtotal_price, total_tax, total_discounts, currency, financial_status, fulfillment_status, \
     tags, ordered_at, processed_at, cancelled_at, updated_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, external_line_item_id, title, quantity, price, total_discount";

/// Internal row type for `PostgreSQL` tenant queries.
#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: TenantId,
    name: String,
    shop_domain: String,
    access_token: Option<String>,
    webhook_secret: Option<String>,
    allow_unverified_webhooks: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = RepositoryError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let shop_domain = ShopDomain::parse(&row.shop_domain).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop domain in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            shop_domain,
            access_token: row.access_token.map(SecretString::from),
            webhook_secret: row.webhook_secret.map(SecretString::from),
            allow_unverified_webhooks: row.allow_unverified_webhooks,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for `PostgreSQL` customer queries.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    tenant_id: TenantId,
    external_id: ExternalId,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    tags: Option<String>,
    total_spent: Decimal,
    orders_count: i32,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            external_id: row.external_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            tags: row.tags,
            total_spent: row.total_spent,
            orders_count: row.orders_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for `PostgreSQL` product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    tenant_id: TenantId,
    external_id: ExternalId,
    title: String,
    description: Option<String>,
    handle: Option<String>,
    vendor: Option<String>,
    product_type: Option<String>,
    status: Option<String>,
    tags: Option<String>,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            external_id: row.external_id,
            title: row.title,
            description: row.description,
            handle: row.handle,
            vendor: row.vendor,
            product_type: row.product_type,
            status: row.status,
            tags: row.tags,
            price: row.price,
            compare_at_price: row.compare_at_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for `PostgreSQL` order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    tenant_id: TenantId,
    external_id: ExternalId,
    customer_id: Option<CustomerId>,
    order_number: Option<String>,
    total_price: Decimal,
    subtotal_price: Decimal,
    total_tax: Decimal,
    total_discounts: Decimal,
    currency: Option<String>,
    financial_status: Option<String>,
    fulfillment_status: Option<String>,
    tags: Option<String>,
    ordered_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            external_id: row.external_id,
            customer_id: row.customer_id,
            order_number: row.order_number,
            total_price: row.total_price,
            subtotal_price: row.subtotal_price,
            total_tax: row.total_tax,
            total_discounts: row.total_discounts,
            currency: row.currency,
            financial_status: row.financial_status.map(FinancialStatus::from),
            fulfillment_status: row.fulfillment_status.map(FulfillmentStatus::from),
            tags: row.tags,
            ordered_at: row.ordered_at,
            processed_at: row.processed_at,
            cancelled_at: row.cancelled_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for `PostgreSQL` order item queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    external_line_item_id: Option<ExternalId>,
    title: String,
    quantity: i32,
    price: Decimal,
    total_discount: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            external_line_item_id: row.external_line_item_id,
            title: row.title,
            quantity: row.quantity,
            price: row.price,
            total_discount: row.total_discount,
        }
    }
}

fn expose(secret: Option<&SecretString>) -> Option<&str> {
    secret.map(ExposeSecret::expose_secret)
}

fn map_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL`-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (used by readiness checks).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Serialize concurrent writers of the same order for the rest of the
    /// transaction, including writers racing to insert it first.
    async fn lock_order_key(
        tx: &mut Transaction<'_, Postgres>,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2))")
            .bind(tenant)
            .bind(external_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_item(
        tx: &mut Transaction<'_, Postgres>,
        order_id: OrderId,
        item: &OrderItemRecord,
    ) -> Result<OrderItem, RepositoryError> {
        let sql = format!(
            "INSERT INTO ingest.sales_order_item \
                 (order_id, product_id, external_line_item_id, title, quantity, price, total_discount) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ORDER_ITEM_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.external_line_item_id.as_ref())
            .bind(&item.title)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.total_discount)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row.into())
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self, tenant), fields(shop_domain = %tenant.shop_domain))]
    async fn create_tenant(&self, tenant: &NewTenant) -> Result<Tenant, RepositoryError> {
        let sql = format!(
            "INSERT INTO ingest.tenant \
                 (name, shop_domain, access_token, webhook_secret, allow_unverified_webhooks) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {TENANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(&tenant.name)
            .bind(tenant.shop_domain.as_str())
            .bind(expose(tenant.access_token.as_ref()))
            .bind(expose(tenant.webhook_secret.as_ref()))
            .bind(tenant.allow_unverified_webhooks)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "shop domain already registered"))?;

        row.try_into()
    }

    #[instrument(skip(self, credentials))]
    async fn update_tenant_credentials(
        &self,
        id: TenantId,
        credentials: &TenantCredentials,
    ) -> Result<Tenant, RepositoryError> {
        let sql = format!(
            "UPDATE ingest.tenant SET \
                 access_token = COALESCE($2, access_token), \
                 webhook_secret = COALESCE($3, webhook_secret), \
                 allow_unverified_webhooks = COALESCE($4, allow_unverified_webhooks), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {TENANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .bind(expose(credentials.access_token.as_ref()))
            .bind(expose(credentials.webhook_secret.as_ref()))
            .bind(credentials.allow_unverified_webhooks)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn tenant_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM ingest.tenant WHERE id = $1");
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn tenant_by_domain(
        &self,
        domain: &ShopDomain,
    ) -> Result<Option<Tenant>, RepositoryError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM ingest.tenant WHERE shop_domain = $1");
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(domain.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_tenants(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM ingest.tenant ORDER BY id");
        let rows = sqlx::query_as::<_, TenantRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_customer(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM ingest.customer \
             WHERE tenant_id = $1 AND external_id = $2"
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(tenant)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Customer::from))
    }

    #[instrument(skip(self, record), fields(external_id = %record.external_id))]
    async fn upsert_customer(
        &self,
        tenant: TenantId,
        record: &CustomerRecord,
    ) -> Result<Customer, RepositoryError> {
        let sql = format!(
            "INSERT INTO ingest.customer \
                 (tenant_id, external_id, email, first_name, last_name, phone, tags, \
                  total_spent, orders_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, NOW()), $11) \
             ON CONFLICT (tenant_id, external_id) DO UPDATE SET \
                 email = EXCLUDED.email, \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 phone = EXCLUDED.phone, \
                 tags = EXCLUDED.tags, \
                 total_spent = EXCLUDED.total_spent, \
                 orders_count = EXCLUDED.orders_count, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(tenant)
            .bind(&record.external_id)
            .bind(record.email.as_deref())
            .bind(record.first_name.as_deref())
            .bind(record.last_name.as_deref())
            .bind(record.phone.as_deref())
            .bind(record.tags.as_deref())
            .bind(record.total_spent)
            .bind(record.orders_count)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    #[instrument(skip(self, contact), fields(external_id = %contact.external_id))]
    async fn upsert_customer_contact(
        &self,
        tenant: TenantId,
        contact: &CustomerContact,
    ) -> Result<Customer, RepositoryError> {
        let sql = format!(
            "INSERT INTO ingest.customer \
                 (tenant_id, external_id, email, first_name, last_name, phone) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (tenant_id, external_id) DO UPDATE SET \
                 email = COALESCE(EXCLUDED.email, customer.email), \
                 first_name = COALESCE(EXCLUDED.first_name, customer.first_name), \
                 last_name = COALESCE(EXCLUDED.last_name, customer.last_name), \
                 phone = COALESCE(EXCLUDED.phone, customer.phone) \
             RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(tenant)
            .bind(&contact.external_id)
            .bind(contact.email.as_deref())
            .bind(contact.first_name.as_deref())
            .bind(contact.last_name.as_deref())
            .bind(contact.phone.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_product(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM ingest.product \
             WHERE tenant_id = $1 AND external_id = $2"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(tenant)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    #[instrument(skip(self, record), fields(external_id = %record.external_id))]
    async fn upsert_product(
        &self,
        tenant: TenantId,
        record: &ProductRecord,
    ) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO ingest.product \
                 (tenant_id, external_id, title, description, handle, vendor, product_type, \
                  status, tags, price, compare_at_price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, COALESCE($12, NOW()), $13) \
             ON CONFLICT (tenant_id, external_id) DO UPDATE SET \
                 title = EXCLUDED.title, \
                 description = EXCLUDED.description, \
                 handle = EXCLUDED.handle, \
                 vendor = EXCLUDED.vendor, \
                 product_type = EXCLUDED.product_type, \
                 status = EXCLUDED.status, \
                 tags = EXCLUDED.tags, \
                 price = EXCLUDED.price, \
                 compare_at_price = EXCLUDED.compare_at_price, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(tenant)
            .bind(&record.external_id)
            .bind(&record.title)
            .bind(record.description.as_deref())
            .bind(record.handle.as_deref())
            .bind(record.vendor.as_deref())
            .bind(record.product_type.as_deref())
            .bind(record.status.as_deref())
            .bind(record.tags.as_deref())
            .bind(record.price)
            .bind(record.compare_at_price)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    #[instrument(skip(self, stub), fields(external_id = %stub.external_id))]
    async fn insert_product_stub(
        &self,
        tenant: TenantId,
        stub: &ProductStub,
    ) -> Result<Product, RepositoryError> {
        sqlx::query(
            "INSERT INTO ingest.product \
                 (tenant_id, external_id, title, handle, vendor, product_type, price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (tenant_id, external_id) DO NOTHING",
        )
        .bind(tenant)
        .bind(&stub.external_id)
        .bind(&stub.title)
        .bind(&stub.handle)
        .bind(stub.vendor.as_deref())
        .bind(stub.product_type.as_deref())
        .bind(stub.price)
        .execute(&self.pool)
        .await?;

        self.find_product(tenant, &stub.external_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_order(
        &self,
        tenant: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM ingest.sales_order \
             WHERE tenant_id = $1 AND external_id = $2"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Order::from))
    }

    async fn order_items(
        &self,
        tenant: TenantId,
        order: OrderId,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT i.id, i.order_id, i.product_id, i.external_line_item_id, i.title, \
                    i.quantity, i.price, i.total_discount \
             FROM ingest.sales_order_item i \
             JOIN ingest.sales_order o ON o.id = i.order_id \
             WHERE o.tenant_id = $1 AND i.order_id = $2 \
             ORDER BY i.id",
        )
        .bind(tenant)
        .bind(order)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    #[instrument(skip(self, write), fields(external_id = %write.order.external_id, items = write.items.len()))]
    async fn replace_order(
        &self,
        tenant: TenantId,
        write: &OrderWrite,
    ) -> Result<ReplacedOrder, RepositoryError> {
        let record = &write.order;
        let mut tx = self.pool.begin().await?;

        Self::lock_order_key(&mut tx, tenant, &record.external_id).await?;

        let previous: Option<Option<String>> = sqlx::query_scalar(
            "SELECT financial_status FROM ingest.sales_order \
             WHERE tenant_id = $1 AND external_id = $2",
        )
        .bind(tenant)
        .bind(&record.external_id)
        .fetch_optional(&mut *tx)
        .await?;

        let existed = previous.is_some();
        let previously_paid = previous
            .flatten()
            .map(FinancialStatus::from)
            .is_some_and(|s| s.is_paid());

        let sql = format!(
            "INSERT INTO ingest.sales_order \
                 (tenant_id, external_id, customer_id, order_number, total_price, subtotal_price, \
                  total_tax, total_discounts, currency, financial_status, fulfillment_status, \
                  tags, ordered_at, processed_at, cancelled_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             ON CONFLICT (tenant_id, external_id) DO UPDATE SET \
                 customer_id = COALESCE(EXCLUDED.customer_id, sales_order.customer_id), \
                 order_number = EXCLUDED.order_number, \
                 total_price = EXCLUDED.total_price, \
                 subtotal_price = EXCLUDED.subtotal_price, \
                 total_tax = EXCLUDED.total_tax, \
                 total_discounts = EXCLUDED.total_discounts, \
                 currency = EXCLUDED.currency, \
                 financial_status = EXCLUDED.financial_status, \
                 fulfillment_status = EXCLUDED.fulfillment_status, \
                 tags = EXCLUDED.tags, \
                 ordered_at = EXCLUDED.ordered_at, \
                 processed_at = EXCLUDED.processed_at, \
                 cancelled_at = EXCLUDED.cancelled_at, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {ORDER_COLUMNS}"
        );
        let order: Order = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant)
            .bind(&record.external_id)
            .bind(record.customer_id)
            .bind(record.order_number.as_deref())
            .bind(record.total_price)
            .bind(record.subtotal_price)
            .bind(record.total_tax)
            .bind(record.total_discounts)
            .bind(record.currency.as_deref())
            .bind(record.financial_status.as_ref().map(FinancialStatus::as_str))
            .bind(record.fulfillment_status.as_ref().map(FulfillmentStatus::as_str))
            .bind(record.tags.as_deref())
            .bind(record.ordered_at)
            .bind(record.processed_at)
            .bind(record.cancelled_at)
            .bind(record.updated_at)
            .fetch_one(&mut *tx)
            .await?
            .into();

        sqlx::query("DELETE FROM ingest.sales_order_item WHERE order_id = $1")
            .bind(order.id)
            .execute(&mut *tx)
            .await?;

        let mut items = Vec::with_capacity(write.items.len());
        for item in &write.items {
            items.push(Self::insert_item(&mut tx, order.id, item).await?);
        }

        let mut credited = false;
        if let Some(credit) = write.credit
            && record.is_paid()
            && !previously_paid
        {
            let result = sqlx::query(
                "UPDATE ingest.customer SET \
                     total_spent = total_spent + $1, \
                     orders_count = orders_count + 1 \
                 WHERE id = $2 AND tenant_id = $3",
            )
            .bind(credit.amount)
            .bind(credit.customer_id)
            .bind(tenant)
            .execute(&mut *tx)
            .await?;
            credited = result.rows_affected() > 0;
        }

        tx.commit().await?;

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
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS( \
                 SELECT 1 FROM ingest.webhook_delivery \
                 WHERE tenant_id = $1 AND webhook_id = $2 \
             )",
        )
        .bind(tenant)
        .bind(webhook_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn record_webhook(
        &self,
        tenant: TenantId,
        webhook_id: &str,
        topic: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO ingest.webhook_delivery (tenant_id, webhook_id, topic) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (tenant_id, webhook_id) DO NOTHING",
        )
        .bind(tenant)
        .bind(webhook_id)
        .bind(topic)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
