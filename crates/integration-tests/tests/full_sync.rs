//! Integration tests for the full sync orchestrator.
//!
//! A scripted page source stands in for the store API.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use futures::StreamExt;
use secrecy::SecretString;

use shop_insights_core::{ResourceType, ShopDomain};
use shop_insights_ingest::models::StoreCredential;
use shop_insights_ingest::reconcile::Reconciler;
use shop_insights_ingest::shopify::{Cursor, Page, ShopifyError};
use shop_insights_ingest::sync::{FullSync, SyncError, pages};
use shop_insights_integration_tests::{
    ScriptedSource, customer_json, line_item, memory_store, order_json, products_page, tenant,
};

fn three_product_pages() -> Vec<Result<Page, ShopifyError>> {
    vec![
        Ok(products_page(0..250, Some("page-2"))),
        Ok(products_page(250..500, Some("page-3"))),
        Ok(products_page(500..510, None)),
    ]
}

#[tokio::test]
async fn test_three_pages_of_products_sync_510_rows() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let source = Arc::new(ScriptedSource::new(three_product_pages()));
    let sync = FullSync::new(source.clone(), Reconciler::new(store.clone()));

    let summary = sync.run(acme.id, ResourceType::Products, None).await.unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.fetched, 510);
    assert_eq!(summary.reconciled, 510);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.products(acme.id).await.len(), 510);
    assert_eq!(
        source.requested().await,
        vec![None, Some(Cursor::new("page-2")), Some(Cursor::new("page-3"))]
    );
}

#[tokio::test]
async fn test_page_stream_ends_with_null_cursor() {
    let source = ScriptedSource::new(three_product_pages());
    let credential = StoreCredential {
        shop_domain: ShopDomain::parse("acme").unwrap(),
        access_token: SecretString::from("shpat_acme"),
    };

    let collected: Vec<Page> = pages(&source, &credential, ResourceType::Products, None)
        .map(Result::unwrap)
        .collect()
        .await;

    let sizes: Vec<_> = collected.iter().map(|p| p.items.len()).collect();
    assert_eq!(sizes, vec![250, 250, 10]);
    assert_eq!(collected.last().unwrap().next_cursor, None);
}

#[tokio::test]
async fn test_resync_is_idempotent() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;

    for _ in 0..2 {
        let source = Arc::new(ScriptedSource::new(three_product_pages()));
        let sync = FullSync::new(source, Reconciler::new(store.clone()));
        sync.run(acme.id, ResourceType::Products, None).await.unwrap();
    }

    assert_eq!(store.products(acme.id).await.len(), 510);
}

#[tokio::test]
async fn test_aborted_run_resumes_from_reported_cursor() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;

    let failing = Arc::new(ScriptedSource::new(vec![
        Ok(products_page(0..250, Some("page-2"))),
        Err(ShopifyError::Status {
            status: 503,
            body: "unavailable".into(),
        }),
    ]));
    let sync = FullSync::new(failing, Reconciler::new(store.clone()));
    let err = sync
        .run(acme.id, ResourceType::Products, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ExternalService { .. }));
    assert_eq!(err.progress().unwrap().reconciled, 250);
    let cursor = err.resume_from().cloned().unwrap();
    assert_eq!(cursor, Cursor::new("page-2"));

    let resumed = Arc::new(ScriptedSource::new(vec![
        Ok(products_page(250..500, Some("page-3"))),
        Ok(products_page(500..510, None)),
    ]));
    let sync = FullSync::new(resumed.clone(), Reconciler::new(store.clone()));
    let summary = sync
        .run(acme.id, ResourceType::Products, Some(cursor.clone()))
        .await
        .unwrap();

    assert_eq!(summary.started_from, Some(cursor));
    assert_eq!(summary.reconciled, 260);
    assert_eq!(store.products(acme.id).await.len(), 510);
}

#[tokio::test]
async fn test_unauthorized_aborts_without_writes() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;
    let before = store.mutation_count().await;

    let source = Arc::new(ScriptedSource::new(vec![Err(ShopifyError::Unauthorized(
        "invalid token".into(),
    ))]));
    let sync = FullSync::new(source, Reconciler::new(store.clone()));
    let err = sync
        .run(acme.id, ResourceType::Customers, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Authentication { .. }));
    assert_eq!(store.mutation_count().await, before);
}

#[tokio::test]
async fn test_run_all_syncs_in_dependency_order() {
    let store = memory_store();
    let acme = tenant(&*store, "acme", true).await;

    let orders = Page {
        items: vec![order_json(
            1,
            Some(7),
            "30.00",
            "paid",
            vec![line_item(2, "Tee")],
        )],
        next_cursor: None,
    };
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(Page {
            items: vec![customer_json(7, "30.00", 1)],
            next_cursor: None,
        }),
        Ok(products_page(2..3, None)),
        Ok(orders),
    ]));
    let sync = FullSync::new(source, Reconciler::new(store.clone()));

    let summaries = sync.run_all(acme.id).await.unwrap();
    let resources: Vec<_> = summaries.iter().map(|s| s.resource).collect();
    assert_eq!(resources, ResourceType::ALL.to_vec());

    // References resolve because customers and products were synced first
    let order = store.orders(acme.id).await.into_iter().next().unwrap();
    let customer = store.customers(acme.id).await.into_iter().next().unwrap();
    assert_eq!(order.customer_id, Some(customer.id));

    // Full sync trusts the platform's aggregates and does not credit
    assert_eq!(customer.orders_count, 1);
}
