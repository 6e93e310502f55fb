//! Shopify REST Admin API payload shapes.
//!
//! The same shapes arrive from collection pages and from webhook bodies.
//! Only the fields ingestion uses are declared; everything else is ignored.
//! Money amounts arrive as decimal strings and are parsed into `Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shop_insights_core::{ExternalId, FinancialStatus, FulfillmentStatus};

// =============================================================================
// Customers
// =============================================================================

/// A customer resource (`customers.json`, `customers/*` webhooks).
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyCustomer {
    pub id: ExternalId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    /// Lifetime spend as reported by the platform.
    #[serde(default)]
    pub total_spent: Option<Decimal>,
    #[serde(default, alias = "number_of_orders")]
    pub orders_count: Option<i32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Products
// =============================================================================

/// A product resource (`products.json`, `products/*` webhooks).
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyProduct {
    pub id: ExternalId,
    pub title: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub variants: Vec<ShopifyVariant>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A product variant; only pricing is used.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyVariant {
    #[serde(default)]
    pub id: Option<ExternalId>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
}

// =============================================================================
// Orders
// =============================================================================

/// An order resource (`orders.json`, `orders/*` webhooks).
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOrder {
    pub id: ExternalId,
    /// Sequential shop-facing number (e.g. `1001`).
    #[serde(default)]
    pub order_number: Option<u64>,
    /// Display name (e.g. `#1001`); used when `order_number` is absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub customer: Option<ShopifyOrderCustomer>,
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub subtotal_price: Option<Decimal>,
    #[serde(default)]
    pub total_tax: Option<Decimal>,
    #[serde(default)]
    pub total_discounts: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub financial_status: Option<FinancialStatus>,
    #[serde(default)]
    pub fulfillment_status: Option<FulfillmentStatus>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub line_items: Vec<ShopifyLineItem>,
}

/// The customer fragment embedded in an order.
///
/// Carries contact fields only; any aggregates it may include are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOrderCustomer {
    #[serde(default)]
    pub id: Option<ExternalId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// One line of an order.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyLineItem {
    #[serde(default)]
    pub id: Option<ExternalId>,
    /// Absent for custom (non-catalog) lines.
    #[serde(default)]
    pub product_id: Option<ExternalId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    pub quantity: i32,
    /// Unit price.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub total_discount: Option<Decimal>,
}

// =============================================================================
// Shop
// =============================================================================

/// Basic shop information (`shop.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopInfo {
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub myshopify_domain: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, alias = "timezone")]
    pub iana_timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShopInfoResponse {
    pub shop: ShopInfo,
}
