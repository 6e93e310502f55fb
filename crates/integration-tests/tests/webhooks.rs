//! Integration tests for webhook ingestion.
//!
//! Covers signature rejection, the paid-order credit under redelivery and
//! the HTTP surface end to end.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use shop_insights_ingest::config::{IngestConfig, ShopifyApiConfig};
use shop_insights_ingest::db::MemoryStore;
use shop_insights_ingest::reconcile::Reconciler;
use shop_insights_ingest::state::AppState;
use shop_insights_ingest::webhooks::{
    WebhookDispatcher, WebhookError, WebhookRequest, WebhookTopic, signature,
};
use shop_insights_integration_tests::{
    ScriptedSource, WEBHOOK_SECRET, customer_json, line_item, memory_store, order_json,
    products_page, tenant,
};

fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

fn secret() -> SecretString {
    SecretString::from(WEBHOOK_SECRET)
}

fn request<'a>(
    topic: WebhookTopic,
    body: &'a [u8],
    signature: Option<&'a str>,
    webhook_id: Option<&'a str>,
) -> WebhookRequest<'a> {
    WebhookRequest {
        topic,
        shop_domain: Some("acme.myshopify.com"),
        signature,
        webhook_id,
        body,
    }
}

// =============================================================================
// Signature rejection
// =============================================================================

#[tokio::test]
async fn test_wrong_signature_produces_zero_mutations() {
    let store = memory_store();
    tenant(&*store, "acme", true).await;
    let dispatcher = WebhookDispatcher::new(Reconciler::new(store.clone()));
    let before = store.mutation_count().await;

    let payload = body(&order_json(1, Some(1), "50.00", "paid", vec![line_item(1, "A")]));
    let forged = signature::sign(&payload, &SecretString::from("not-the-secret"));

    let err = dispatcher
        .dispatch(request(WebhookTopic::OrdersPaid, &payload, Some(&forged), Some("w-1")))
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::SignatureMismatch));
    assert_eq!(store.mutation_count().await, before);
}

#[tokio::test]
async fn test_body_altered_after_signing_is_rejected() {
    let store = memory_store();
    tenant(&*store, "acme", true).await;
    let dispatcher = WebhookDispatcher::new(Reconciler::new(store.clone()));
    let before = store.mutation_count().await;

    let signed = body(&customer_json(1, "10.00", 1));
    let sig = signature::sign(&signed, &secret());
    let tampered = body(&customer_json(1, "99999.00", 1));

    let err = dispatcher
        .dispatch(request(WebhookTopic::CustomersUpdate, &tampered, Some(&sig), None))
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::SignatureMismatch));
    assert_eq!(store.mutation_count().await, before);
}

// =============================================================================
// Paid order credit
// =============================================================================

async fn paid_scenario() -> (Arc<MemoryStore>, WebhookDispatcher, shop_insights_core::TenantId) {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let dispatcher = WebhookDispatcher::new(Reconciler::new(store.clone()));

    // Customer starts at spend=100.00, ordersCount=1
    let customer = body(&customer_json(1, "100.00", 1));
    let sig = signature::sign(&customer, &secret());
    dispatcher
        .dispatch(request(WebhookTopic::CustomersCreate, &customer, Some(&sig), Some("c-1")))
        .await
        .unwrap();

    (store, dispatcher, acme.id)
}

fn assert_customer_totals(customers: &[shop_insights_ingest::models::Customer], spent: i64, count: i32) {
    assert_eq!(customers.len(), 1);
    let customer = customers.first().unwrap();
    assert_eq!(customer.total_spent, Decimal::new(spent, 2));
    assert_eq!(customer.orders_count, count);
}

#[tokio::test]
async fn test_paid_order_credits_customer_once() {
    let (store, dispatcher, tenant_id) = paid_scenario().await;
    let order = body(&order_json(500, Some(1), "50.00", "paid", vec![line_item(1, "A")]));
    let sig = signature::sign(&order, &secret());

    let outcome = dispatcher
        .dispatch(request(WebhookTopic::OrdersPaid, &order, Some(&sig), Some("o-1")))
        .await
        .unwrap();
    assert!(!outcome.duplicate);
    assert_customer_totals(&store.customers(tenant_id).await, 15000, 2);

    // Identical redelivery
    let outcome = dispatcher
        .dispatch(request(WebhookTopic::OrdersPaid, &order, Some(&sig), Some("o-1")))
        .await
        .unwrap();
    assert!(outcome.duplicate);
    assert_customer_totals(&store.customers(tenant_id).await, 15000, 2);
}

#[tokio::test]
async fn test_paid_order_redelivered_without_id_credits_once() {
    let (store, dispatcher, tenant_id) = paid_scenario().await;
    let order = body(&order_json(500, Some(1), "50.00", "paid", vec![line_item(1, "A")]));
    let sig = signature::sign(&order, &secret());

    for _ in 0..2 {
        dispatcher
            .dispatch(request(WebhookTopic::OrdersPaid, &order, Some(&sig), None))
            .await
            .unwrap();
    }

    assert_customer_totals(&store.customers(tenant_id).await, 15000, 2);
}

#[tokio::test]
async fn test_paid_then_updated_credits_once() {
    let (store, dispatcher, tenant_id) = paid_scenario().await;
    let order = body(&order_json(500, Some(1), "50.00", "paid", vec![line_item(1, "A")]));
    let sig = signature::sign(&order, &secret());

    dispatcher
        .dispatch(request(WebhookTopic::OrdersPaid, &order, Some(&sig), Some("o-1")))
        .await
        .unwrap();
    dispatcher
        .dispatch(request(WebhookTopic::OrdersUpdated, &order, Some(&sig), Some("o-2")))
        .await
        .unwrap();

    assert_customer_totals(&store.customers(tenant_id).await, 15000, 2);
    assert_eq!(store.orders(tenant_id).await.len(), 1);
}

#[tokio::test]
async fn test_pending_order_does_not_credit_until_paid() {
    let (store, dispatcher, tenant_id) = paid_scenario().await;

    let pending = body(&order_json(500, Some(1), "50.00", "pending", vec![line_item(1, "A")]));
    let sig = signature::sign(&pending, &secret());
    dispatcher
        .dispatch(request(WebhookTopic::OrdersCreate, &pending, Some(&sig), Some("o-1")))
        .await
        .unwrap();
    assert_customer_totals(&store.customers(tenant_id).await, 10000, 1);

    let paid = body(&order_json(500, Some(1), "50.00", "paid", vec![line_item(1, "A")]));
    let sig = signature::sign(&paid, &secret());
    dispatcher
        .dispatch(request(WebhookTopic::OrdersPaid, &paid, Some(&sig), Some("o-2")))
        .await
        .unwrap();
    assert_customer_totals(&store.customers(tenant_id).await, 15000, 2);
}

// =============================================================================
// HTTP routes
// =============================================================================

fn config(operator_token: Option<&str>) -> IngestConfig {
    IngestConfig {
        database_url: SecretString::from("postgres://unused"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        shopify: ShopifyApiConfig::default(),
        operator_token: operator_token.map(SecretString::from),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn webhook_post(path: &str, payload: &[u8], sig: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(path)
        .header("content-type", "application/json")
        .header("x-shopify-shop-domain", "acme.myshopify.com")
        .header("x-shopify-webhook-id", "route-1");
    if let Some(sig) = sig {
        builder = builder.header("x-shopify-hmac-sha256", sig);
    }
    builder.body(Body::from(payload.to_vec())).unwrap()
}

#[tokio::test]
async fn test_route_accepts_signed_webhook() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let app = shop_insights_ingest::app(AppState::from_parts(
        config(None),
        store.clone(),
        Arc::new(ScriptedSource::default()),
    ));

    let payload = body(&customer_json(1, "10.00", 1));
    let sig = signature::sign(&payload, &secret());
    let response = app
        .clone()
        .oneshot(webhook_post("/webhooks/shopify/customers/create", &payload, Some(&sig)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["duplicate"], false);
    assert_eq!(store.customers(acme.id).await.len(), 1);

    let response = app
        .oneshot(webhook_post("/webhooks/shopify/customers/create", &payload, Some(&sig)))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["duplicate"], true);
}

#[tokio::test]
async fn test_route_rejects_unsigned_and_unknown() {
    let store = memory_store();
    tenant(&*store, "acme", true).await;
    let before = store.mutation_count().await;
    let app = shop_insights_ingest::app(AppState::from_parts(
        config(None),
        store.clone(),
        Arc::new(ScriptedSource::default()),
    ));
    let payload = body(&customer_json(1, "10.00", 1));

    let response = app
        .clone()
        .oneshot(webhook_post("/webhooks/shopify/customers/create", &payload, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["success"], false);

    let response = app
        .clone()
        .oneshot(webhook_post("/webhooks/shopify/collections/create", &payload, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.mutation_count().await, before);
}

#[tokio::test]
async fn test_sync_route_requires_operator_token() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let path = format!("/api/tenants/{}/sync/products", acme.id);

    let disabled = shop_insights_ingest::app(AppState::from_parts(
        config(None),
        store.clone(),
        Arc::new(ScriptedSource::default()),
    ));
    let response = disabled
        .oneshot(Request::post(path.as_str()).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let source = Arc::new(ScriptedSource::new(vec![Ok(products_page(0..3, None))]));
    let app = shop_insights_ingest::app(AppState::from_parts(
        config(Some("op-token-x7Kp9qR2")),
        store.clone(),
        source,
    ));

    let response = app
        .clone()
        .oneshot(
            Request::post(path.as_str())
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.products(acme.id).await.is_empty());

    let response = app
        .oneshot(
            Request::post(path.as_str())
                .header("authorization", "Bearer op-token-x7Kp9qR2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["summaries"][0]["reconciled"], 3);
    assert_eq!(store.products(acme.id).await.len(), 3);
}
