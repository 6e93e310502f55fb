//! Order and order item models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shop_insights_core::{
    CustomerId, ExternalId, FinancialStatus, FulfillmentStatus, OrderId, OrderItemId, ProductId,
    TenantId,
};

/// A stored order header, unique per `(tenant_id, external_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub external_id: ExternalId,
    /// Absent for guest orders and for customers not yet synced.
    pub customer_id: Option<CustomerId>,
    pub order_number: Option<String>,
    pub total_price: Decimal,
    pub subtotal_price: Decimal,
    pub total_tax: Decimal,
    pub total_discounts: Decimal,
    pub currency: Option<String>,
    pub financial_status: Option<FinancialStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub tags: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether the stored order is recorded as paid.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.financial_status.as_ref().is_some_and(FinancialStatus::is_paid)
    }
}

/// A stored line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// Absent when the product has not been synced (lookup-only resolution).
    pub product_id: Option<ProductId>,
    pub external_line_item_id: Option<ExternalId>,
    pub title: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total_discount: Decimal,
}

/// Order header snapshot, as written by order reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub external_id: ExternalId,
    /// Resolved customer. `None` keeps an existing link.
    pub customer_id: Option<CustomerId>,
    pub order_number: Option<String>,
    pub total_price: Decimal,
    pub subtotal_price: Decimal,
    pub total_tax: Decimal,
    pub total_discounts: Decimal,
    pub currency: Option<String>,
    pub financial_status: Option<FinancialStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
    pub tags: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderRecord {
    /// Whether the incoming snapshot is paid.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.financial_status.as_ref().is_some_and(FinancialStatus::is_paid)
    }
}

/// One line of an order snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemRecord {
    pub product_id: Option<ProductId>,
    pub external_line_item_id: Option<ExternalId>,
    pub title: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total_discount: Decimal,
}

/// Credit applied to a customer's aggregates when an order becomes paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerCredit {
    pub customer_id: CustomerId,
    pub amount: Decimal,
}

/// Everything written by one order reconciliation, applied atomically:
/// header upsert, item delete, item recreate and (optionally) the credit.
///
/// The credit is only applied when the stored order was not already paid
/// before this write, so replays and later updates of a paid order never
/// credit the customer twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWrite {
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
    pub credit: Option<CustomerCredit>,
}

/// Result of an atomic order replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Whether the order existed before this write.
    pub existed: bool,
    /// Whether the customer credit was applied.
    pub credited: bool,
}
