//! Integration tests for the reconciliation engine.
//!
//! These run against the in-memory store, which keeps the same uniqueness
//! and atomicity guarantees as `PostgreSQL`.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use serde_json::Value;

use shop_insights_core::{ExternalId, FinancialStatus, FulfillmentStatus, ResourceType};
use shop_insights_ingest::db::Store;
use shop_insights_ingest::reconcile::{ReconcileOptions, Reconciler};
use shop_insights_ingest::shopify::{ShopifyCustomer, ShopifyOrder, ShopifyProduct};
use shop_insights_integration_tests::{
    customer_json, line_item, memory_store, order_json, product_json, tenant,
};

fn parse<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_customer_snapshot_is_idempotent() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let reconciler = Reconciler::new(store.clone());
    let payload: ShopifyCustomer = parse(customer_json(1, "25.50", 3));

    let first = reconciler.reconcile_customer(acme.id, &payload).await.unwrap();
    let second = reconciler.reconcile_customer(acme.id, &payload).await.unwrap();

    assert_eq!(first, second);
    let customers = store.customers(acme.id).await;
    assert_eq!(customers.len(), 1);
    assert_eq!(customers.first().unwrap().total_spent, Decimal::new(2550, 2));
    assert_eq!(customers.first().unwrap().orders_count, 3);
}

#[tokio::test]
async fn test_product_snapshot_is_idempotent() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let reconciler = Reconciler::new(store.clone());
    let payload: ShopifyProduct = parse(product_json(7, "Pineapple Tee"));

    let first = reconciler.reconcile_product(acme.id, &payload).await.unwrap();
    let second = reconciler.reconcile_product(acme.id, &payload).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.products(acme.id).await.len(), 1);
    assert_eq!(first.price, Decimal::new(1999, 2));
}

#[tokio::test]
async fn test_order_reconcile_twice_keeps_one_order_and_item_set() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let reconciler = Reconciler::new(store.clone());
    let payload: ShopifyOrder = parse(order_json(
        5,
        None,
        "20.00",
        "pending",
        vec![line_item(1, "A"), line_item(2, "B")],
    ));

    let first = reconciler
        .reconcile_order(acme.id, &payload, ReconcileOptions::webhook())
        .await
        .unwrap();
    let second = reconciler
        .reconcile_order(acme.id, &payload, ReconcileOptions::webhook())
        .await
        .unwrap();

    assert!(!first.existed);
    assert!(second.existed);
    assert_eq!(first.order.id, second.order.id);
    assert_eq!(store.orders(acme.id).await.len(), 1);
    assert_eq!(store.products(acme.id).await.len(), 2);
    let items = store.order_items(acme.id, second.order.id).await.unwrap();
    assert_eq!(items.len(), 2);
}

// =============================================================================
// Uniqueness
// =============================================================================

#[tokio::test]
async fn test_concurrent_reconciles_keep_one_row_per_external_id() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let reconciler = Reconciler::new(store.clone());

    let mut handles = Vec::new();
    for i in 0..16 {
        let reconciler = reconciler.clone();
        let tenant_id = acme.id;
        handles.push(tokio::spawn(async move {
            let customer: ShopifyCustomer = parse(customer_json(1, "10.00", 1));
            let order: ShopifyOrder = parse(order_json(
                9,
                Some(1),
                "10.00",
                "pending",
                vec![line_item(3, &format!("Line {i}"))],
            ));
            reconciler.reconcile_customer(tenant_id, &customer).await.unwrap();
            reconciler
                .reconcile_order(tenant_id, &order, ReconcileOptions::webhook())
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.customers(acme.id).await.len(), 1);
    assert_eq!(store.products(acme.id).await.len(), 1);
    let orders = store.orders(acme.id).await;
    assert_eq!(orders.len(), 1);
    let items = store
        .order_items(acme.id, orders.first().unwrap().id)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
}

// =============================================================================
// Order item replace law
// =============================================================================

#[tokio::test]
async fn test_order_items_are_replaced_not_merged() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let reconciler = Reconciler::new(store.clone());

    let with_ab: ShopifyOrder = parse(order_json(
        5,
        None,
        "20.00",
        "pending",
        vec![line_item(1, "A"), line_item(2, "B")],
    ));
    let with_ac: ShopifyOrder = parse(order_json(
        5,
        None,
        "20.00",
        "pending",
        vec![line_item(1, "A"), line_item(3, "C")],
    ));

    reconciler
        .reconcile_order(acme.id, &with_ab, ReconcileOptions::webhook())
        .await
        .unwrap();
    let replaced = reconciler
        .reconcile_order(acme.id, &with_ac, ReconcileOptions::webhook())
        .await
        .unwrap();

    let items = store
        .order_items(acme.id, replaced.order.id)
        .await
        .unwrap();
    let mut titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(titles, vec!["A", "C"]);

    // The product for B stays; only the line item goes
    assert_eq!(store.products(acme.id).await.len(), 3);
}

#[tokio::test]
async fn test_full_sync_order_skips_unknown_references() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let reconciler = Reconciler::new(store.clone());
    let order = order_json(5, Some(77), "20.00", "paid", vec![line_item(1, "A")]);

    reconciler
        .reconcile_raw(acme.id, ResourceType::Orders, order, ReconcileOptions::full_sync())
        .await
        .unwrap();

    let orders = store.orders(acme.id).await;
    let stored = orders.first().unwrap();
    assert_eq!(stored.customer_id, None);
    assert_eq!(stored.financial_status, Some(FinancialStatus::Paid));
    assert!(store.customers(acme.id).await.is_empty());
    assert!(store.products(acme.id).await.is_empty());
    let items = store.order_items(acme.id, stored.id).await.unwrap();
    assert_eq!(items.first().unwrap().product_id, None);
}

#[tokio::test]
async fn test_unlisted_statuses_are_stored_verbatim() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let reconciler = Reconciler::new(store.clone());

    let mut payload = order_json(6, None, "20.00", "pending_capture", vec![line_item(1, "A")]);
    payload["fulfillment_status"] = Value::from("in_progress");
    let payload: ShopifyOrder = parse(payload);

    let replaced = reconciler
        .reconcile_order(acme.id, &payload, ReconcileOptions::webhook())
        .await
        .unwrap();

    let stored = store.orders(acme.id).await.into_iter().next().unwrap();
    assert_eq!(stored, replaced.order);
    assert_eq!(
        stored.financial_status.as_ref().map(FinancialStatus::as_str),
        Some("pending_capture")
    );
    assert_eq!(
        stored.fulfillment_status.as_ref().map(FulfillmentStatus::as_str),
        Some("in_progress")
    );
    assert!(!stored.is_paid());
}

// =============================================================================
// Tenant isolation
// =============================================================================

#[tokio::test]
async fn test_same_external_id_is_isolated_per_tenant() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let globex = tenant(&*store, "globex", true).await;
    let reconciler = Reconciler::new(store.clone());

    let globex_customer: ShopifyCustomer = parse(customer_json(1, "999.00", 9));
    reconciler
        .reconcile_customer(globex.id, &globex_customer)
        .await
        .unwrap();
    let globex_before = store.customers(globex.id).await;

    let acme_customer: ShopifyCustomer = parse(customer_json(1, "5.00", 1));
    let acme_order: ShopifyOrder = parse(order_json(
        1,
        Some(1),
        "5.00",
        "paid",
        vec![line_item(1, "A")],
    ));
    reconciler
        .reconcile_customer(acme.id, &acme_customer)
        .await
        .unwrap();
    reconciler
        .reconcile_order(acme.id, &acme_order, ReconcileOptions::webhook())
        .await
        .unwrap();

    assert_eq!(store.customers(globex.id).await, globex_before);
    assert!(store.orders(globex.id).await.is_empty());
    assert!(store.products(globex.id).await.is_empty());

    let acme_customers = store.customers(acme.id).await;
    assert_eq!(acme_customers.len(), 1);
    assert_eq!(acme_customers.first().unwrap().external_id, ExternalId::from(1_u64));
    assert_eq!(acme_customers.first().unwrap().total_spent, Decimal::new(1000, 2));
}

#[tokio::test]
async fn test_store_lookups_never_cross_tenants() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let globex = tenant(&*store, "globex", true).await;
    let reconciler = Reconciler::new(store.clone());

    let payload: ShopifyProduct = parse(product_json(4, "Shared id"));
    reconciler.reconcile_product(acme.id, &payload).await.unwrap();

    let id = ExternalId::from(4_u64);
    assert!(store.find_product(acme.id, &id).await.unwrap().is_some());
    assert!(store.find_product(globex.id, &id).await.unwrap().is_none());
}
