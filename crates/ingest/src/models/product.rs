//! Product model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shop_insights_core::{ExternalId, ProductId, TenantId};

/// A stored product, unique per `(tenant_id, external_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub external_id: ExternalId,
    pub title: String,
    pub description: Option<String>,
    pub handle: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
    /// Price of the first variant.
    pub price: Decimal,
    /// Compare-at price of the first variant.
    pub compare_at_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full product snapshot, as written by product reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub external_id: ExternalId,
    pub title: String,
    pub description: Option<String>,
    pub handle: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Minimal product derived from an order line item.
///
/// Only ever inserted when no product with the external id exists; an
/// existing product is never overwritten by line-item data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStub {
    pub external_id: ExternalId,
    pub title: String,
    pub handle: String,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub price: Decimal,
}
