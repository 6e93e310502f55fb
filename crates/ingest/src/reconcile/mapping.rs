//! Platform payload to store record mapping.
//!
//! Pure functions: no store access, no I/O. Every field the store keeps is
//! derived here so full sync and webhooks write identical rows for identical
//! payloads.

use rust_decimal::Decimal;

use shop_insights_core::{CustomerId, ExternalId, ProductId};

use super::ReconcileError;
use crate::models::{
    CustomerContact, CustomerRecord, OrderItemRecord, OrderRecord, ProductRecord, ProductStub,
};
use crate::shopify::{
    ShopifyCustomer, ShopifyLineItem, ShopifyOrder, ShopifyOrderCustomer, ShopifyProduct,
};

/// Derive a URL handle from a title: lowercase, whitespace runs become `-`.
///
/// ```
/// use shop_insights_ingest::reconcile::slugify_handle;
///
/// assert_eq!(slugify_handle("  Blue   Cotton Tee "), "blue-cotton-tee");
/// ```
#[must_use]
pub fn slugify_handle(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Empty strings from the platform mean "not set".
fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// Full customer snapshot, including the platform-reported aggregates.
pub fn customer_record(payload: &ShopifyCustomer) -> CustomerRecord {
    CustomerRecord {
        external_id: payload.id.clone(),
        email: non_empty(payload.email.as_deref()),
        first_name: non_empty(payload.first_name.as_deref()),
        last_name: non_empty(payload.last_name.as_deref()),
        phone: non_empty(payload.phone.as_deref()),
        tags: non_empty(payload.tags.as_deref()),
        total_spent: payload.total_spent.unwrap_or(Decimal::ZERO),
        orders_count: payload.orders_count.unwrap_or(0),
        created_at: payload.created_at,
        updated_at: payload.updated_at,
    }
}

/// Contact fields of an order's embedded customer.
///
/// Returns `None` for a fragment without an id (nothing to key it on).
pub fn customer_contact(fragment: &ShopifyOrderCustomer) -> Option<CustomerContact> {
    let external_id = fragment.id.clone()?;
    Some(CustomerContact {
        external_id,
        email: non_empty(fragment.email.as_deref()),
        first_name: non_empty(fragment.first_name.as_deref()),
        last_name: non_empty(fragment.last_name.as_deref()),
        phone: non_empty(fragment.phone.as_deref()),
    })
}

/// Full product snapshot; pricing comes from the first variant.
///
/// # Errors
///
/// Returns `ReconcileError::InvalidPayload` for a blank title.
pub fn product_record(payload: &ShopifyProduct) -> Result<ProductRecord, ReconcileError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ReconcileError::InvalidPayload(format!(
            "product {} has no title",
            payload.id
        )));
    }

    let first_variant = payload.variants.first();

    Ok(ProductRecord {
        external_id: payload.id.clone(),
        title: title.to_owned(),
        description: non_empty(payload.body_html.as_deref()),
        handle: non_empty(payload.handle.as_deref()).or_else(|| Some(slugify_handle(title))),
        vendor: non_empty(payload.vendor.as_deref()),
        product_type: non_empty(payload.product_type.as_deref()),
        status: non_empty(payload.status.as_deref()),
        tags: non_empty(payload.tags.as_deref()),
        price: first_variant
            .and_then(|v| v.price)
            .unwrap_or(Decimal::ZERO),
        compare_at_price: first_variant.and_then(|v| v.compare_at_price),
        created_at: payload.created_at,
        updated_at: payload.updated_at,
    })
}

/// Title of a line item; required because stored items and stubs need one.
fn line_title(line: &ShopifyLineItem) -> Result<String, ReconcileError> {
    non_empty(line.title.as_deref()).ok_or_else(|| {
        ReconcileError::InvalidPayload(format!(
            "line item {} has no title",
            line.id.as_ref().map_or("<unknown>", ExternalId::as_str)
        ))
    })
}

/// Minimal product created from a line item when its product is unknown.
///
/// # Errors
///
/// Returns `ReconcileError::InvalidPayload` if the line has no title.
pub fn product_stub(
    line: &ShopifyLineItem,
    product_id: &ExternalId,
) -> Result<ProductStub, ReconcileError> {
    let title = line_title(line)?;
    Ok(ProductStub {
        external_id: product_id.clone(),
        handle: slugify_handle(&title),
        title,
        vendor: non_empty(line.vendor.as_deref()),
        product_type: None,
        price: line.price.unwrap_or(Decimal::ZERO),
    })
}

/// One stored order line.
///
/// # Errors
///
/// Returns `ReconcileError::InvalidPayload` for a missing title or a
/// negative quantity.
pub fn order_item_record(
    line: &ShopifyLineItem,
    product_id: Option<ProductId>,
) -> Result<OrderItemRecord, ReconcileError> {
    if line.quantity < 0 {
        return Err(ReconcileError::InvalidPayload(format!(
            "line item has negative quantity {}",
            line.quantity
        )));
    }

    Ok(OrderItemRecord {
        product_id,
        external_line_item_id: line.id.clone(),
        title: line_title(line)?,
        quantity: line.quantity,
        price: line.price.unwrap_or(Decimal::ZERO),
        total_discount: line.total_discount.unwrap_or(Decimal::ZERO),
    })
}

/// Order header snapshot. `customer_id` is whatever resolution produced.
pub fn order_record(payload: &ShopifyOrder, customer_id: Option<CustomerId>) -> OrderRecord {
    OrderRecord {
        external_id: payload.id.clone(),
        customer_id,
        order_number: payload
            .order_number
            .map(|n| n.to_string())
            .or_else(|| non_empty(payload.name.as_deref())),
        total_price: payload.total_price.unwrap_or(Decimal::ZERO),
        subtotal_price: payload.subtotal_price.unwrap_or(Decimal::ZERO),
        total_tax: payload.total_tax.unwrap_or(Decimal::ZERO),
        total_discounts: payload.total_discounts.unwrap_or(Decimal::ZERO),
        currency: non_empty(payload.currency.as_deref()),
        financial_status: payload.financial_status.clone(),
        fulfillment_status: payload.fulfillment_status.clone(),
        tags: non_empty(payload.tags.as_deref()),
        ordered_at: payload.created_at,
        processed_at: payload.processed_at,
        cancelled_at: payload.cancelled_at,
        updated_at: payload.updated_at,
    }
}
