//! Integration tests for Shop Insights.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory suites (no database or network needed)
//! cargo test -p shop-insights-integration-tests
//!
//! # Postgres suite
//! TEST_DATABASE_URL=postgres://localhost/shop_insights_test \
//!     cargo test -p shop-insights-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `reconciliation` - idempotence, uniqueness, item replacement, tenant isolation
//! - `webhooks` - signature rejection, paid-order credit and redelivery, HTTP routes
//! - `full_sync` - cursor pagination and resume
//! - `postgres` - the same guarantees against a real database
//!
//! This module holds the shared fixtures: tenant setup and payload builders.
//! The scripted page source is re-exported from the ingest crate.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{Value, json};

use shop_insights_core::ShopDomain;
use shop_insights_ingest::db::{MemoryStore, Store};
use shop_insights_ingest::models::{NewTenant, Tenant};
use shop_insights_ingest::shopify::{Cursor, Page};

pub use shop_insights_ingest::shopify::ScriptedSource;

/// Webhook secret used by signed fixture tenants.
pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";

/// Create a tenant on `store`.
///
/// With `signed`, the tenant has a webhook secret; otherwise it accepts
/// unsigned webhooks.
pub async fn tenant(store: &dyn Store, handle: &str, signed: bool) -> Tenant {
    store
        .create_tenant(&NewTenant {
            name: handle.to_string(),
            shop_domain: ShopDomain::parse(handle).unwrap(),
            access_token: Some(SecretString::from(format!("shpat_{handle}"))),
            webhook_secret: signed.then(|| SecretString::from(WEBHOOK_SECRET)),
            allow_unverified_webhooks: !signed,
        })
        .await
        .unwrap()
}

/// A fresh in-memory store behind an `Arc`.
#[must_use]
pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

// =============================================================================
// Payload builders
// =============================================================================

#[must_use]
pub fn customer_json(id: u64, total_spent: &str, orders_count: i32) -> Value {
    json!({
        "id": id,
        "email": format!("customer{id}@example.com"),
        "first_name": "Ann",
        "last_name": "Lee",
        "total_spent": total_spent,
        "orders_count": orders_count,
        "created_at": "2024-01-05T10:00:00Z",
        "updated_at": "2024-01-05T10:00:00Z",
    })
}

#[must_use]
pub fn product_json(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "handle": format!("product-{id}"),
        "vendor": "Acme",
        "status": "active",
        "variants": [{ "id": id * 10, "price": "19.99" }],
    })
}

/// A line item; `id` doubles as the product id.
#[must_use]
pub fn line_item(id: u64, title: &str) -> Value {
    json!({
        "id": id * 100,
        "product_id": id,
        "title": title,
        "quantity": 1,
        "price": "10.00",
        "total_discount": "0.00",
    })
}

#[must_use]
pub fn order_json(
    id: u64,
    customer_id: Option<u64>,
    total: &str,
    financial_status: &str,
    items: Vec<Value>,
) -> Value {
    json!({
        "id": id,
        "order_number": 1000 + id,
        "customer": customer_id.map(|c| json!({ "id": c, "email": format!("customer{c}@example.com") })),
        "total_price": total,
        "subtotal_price": total,
        "total_tax": "0.00",
        "total_discounts": "0.00",
        "currency": "USD",
        "financial_status": financial_status,
        "created_at": "2024-02-01T12:00:00Z",
        "line_items": items,
    })
}

/// A page of `ids.len()` distinct products.
#[must_use]
pub fn products_page(ids: std::ops::Range<u64>, next: Option<&str>) -> Page {
    Page {
        items: ids.map(|id| product_json(id, &format!("Product {id}"))).collect(),
        next_cursor: next.map(Cursor::new),
    }
}
