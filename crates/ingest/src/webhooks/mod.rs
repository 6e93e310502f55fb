//! Webhook ingestion.
//!
//! # Processing order
//!
//! 1. Resolve the tenant from `X-Shopify-Shop-Domain`
//! 2. Authenticate the raw body (HMAC), or accept it unsigned only if the
//!    tenant's operator acknowledged unverified mode
//! 3. Skip deliveries whose `X-Shopify-Webhook-Id` was already processed
//! 4. Parse the body for the topic's resource and reconcile it
//! 5. Record the delivery id
//!
//! Steps 1-3 never write to the store, so a rejected or duplicate request
//! leaves it untouched. Processing is synchronous; a failure surfaces as an
//! HTTP error and Shopify's own retry policy redelivers.

pub mod signature;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use shop_insights_core::{ResourceType, ShopDomain, TenantId};

use crate::db::RepositoryError;
use crate::models::WebhookVerification;
use crate::reconcile::{ReconcileError, ReconcileOptions, Reconciler};
use crate::shopify::{ShopifyCustomer, ShopifyOrder, ShopifyProduct};

/// Errors that can occur while handling a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No tenant is registered for the shop domain (or the header is absent).
    #[error("no tenant for shop domain: {0}")]
    TenantNotFound(String),

    /// The tenant has a secret but the request carries no signature.
    #[error("missing webhook signature")]
    MissingSignature,

    /// The signature does not match the body.
    #[error("webhook signature mismatch")]
    SignatureMismatch,

    /// The tenant has no secret and has not acknowledged unverified mode.
    #[error("tenant has no webhook secret and unverified webhooks are not allowed")]
    UnverifiedNotAcknowledged,

    /// The body does not match the topic's payload shape.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// Reconciliation failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The store failed outside reconciliation (tenant lookup, dedupe).
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A supported webhook topic (`{resource}/{event}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookTopic {
    CustomersCreate,
    CustomersUpdate,
    ProductsCreate,
    ProductsUpdate,
    OrdersCreate,
    OrdersUpdated,
    OrdersPaid,
}

impl WebhookTopic {
    pub const ALL: [Self; 7] = [
        Self::CustomersCreate,
        Self::CustomersUpdate,
        Self::ProductsCreate,
        Self::ProductsUpdate,
        Self::OrdersCreate,
        Self::OrdersUpdated,
        Self::OrdersPaid,
    ];

    /// Parse the two path segments of a webhook URL.
    ///
    /// Returns `None` for topics this service does not handle.
    #[must_use]
    pub fn from_path(resource: &str, event: &str) -> Option<Self> {
        match (resource, event) {
            ("customers", "create") => Some(Self::CustomersCreate),
            ("customers", "update") => Some(Self::CustomersUpdate),
            ("products", "create") => Some(Self::ProductsCreate),
            ("products", "update") => Some(Self::ProductsUpdate),
            ("orders", "create") => Some(Self::OrdersCreate),
            ("orders", "updated") => Some(Self::OrdersUpdated),
            ("orders", "paid") => Some(Self::OrdersPaid),
            _ => None,
        }
    }

    /// Topic name as Shopify spells it (`orders/paid`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CustomersCreate => "customers/create",
            Self::CustomersUpdate => "customers/update",
            Self::ProductsCreate => "products/create",
            Self::ProductsUpdate => "products/update",
            Self::OrdersCreate => "orders/create",
            Self::OrdersUpdated => "orders/updated",
            Self::OrdersPaid => "orders/paid",
        }
    }

    /// The resource the payload describes.
    #[must_use]
    pub const fn resource(&self) -> ResourceType {
        match self {
            Self::CustomersCreate | Self::CustomersUpdate => ResourceType::Customers,
            Self::ProductsCreate | Self::ProductsUpdate => ResourceType::Products,
            Self::OrdersCreate | Self::OrdersUpdated | Self::OrdersPaid => ResourceType::Orders,
        }
    }
}

impl std::fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound webhook, as extracted from the HTTP request.
#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
    pub topic: WebhookTopic,
    /// `X-Shopify-Shop-Domain`
    pub shop_domain: Option<&'a str>,
    /// `X-Shopify-Hmac-Sha256`
    pub signature: Option<&'a str>,
    /// `X-Shopify-Webhook-Id`
    pub webhook_id: Option<&'a str>,
    /// Raw, unparsed body.
    pub body: &'a [u8],
}

/// Result of a handled webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookOutcome {
    pub tenant_id: TenantId,
    /// The delivery id was already processed; nothing was written.
    pub duplicate: bool,
}

/// Routes authenticated webhooks to the reconciliation engine.
#[derive(Clone)]
pub struct WebhookDispatcher {
    reconciler: Reconciler,
}

impl WebhookDispatcher {
    #[must_use]
    pub const fn new(reconciler: Reconciler) -> Self {
        Self { reconciler }
    }

    /// Handle one webhook delivery.
    ///
    /// # Errors
    ///
    /// - `TenantNotFound` if the shop domain is missing or unknown
    /// - `MissingSignature` / `SignatureMismatch` if authentication fails
    /// - `UnverifiedNotAcknowledged` if the tenant has no secret configured
    /// - `InvalidPayload` / `Reconcile` if the body cannot be ingested
    #[instrument(
        skip(self, request),
        fields(topic = %request.topic, shop_domain = ?request.shop_domain, webhook_id = ?request.webhook_id)
    )]
    pub async fn dispatch(
        &self,
        request: WebhookRequest<'_>,
    ) -> Result<WebhookOutcome, WebhookError> {
        let store = self.reconciler.store();

        // 1. Tenant
        let raw_domain = request
            .shop_domain
            .ok_or_else(|| WebhookError::TenantNotFound("<missing header>".to_string()))?;
        let domain = ShopDomain::parse(raw_domain)
            .map_err(|_| WebhookError::TenantNotFound(raw_domain.to_string()))?;
        let tenant = store
            .tenant_by_domain(&domain)
            .await?
            .ok_or_else(|| WebhookError::TenantNotFound(domain.to_string()))?;

        // 2. Authentication
        match tenant.webhook_verification() {
            WebhookVerification::Signed(secret) => {
                let provided = request.signature.ok_or(WebhookError::MissingSignature)?;
                if !signature::verify(request.body, provided, secret) {
                    tracing::warn!(tenant_id = %tenant.id, "Webhook signature mismatch");
                    return Err(WebhookError::SignatureMismatch);
                }
            }
            WebhookVerification::UnverifiedAcknowledged => {
                tracing::warn!(
                    tenant_id = %tenant.id,
                    "Accepting unsigned webhook: tenant has no webhook secret (unverified mode acknowledged)"
                );
            }
            WebhookVerification::Refused => {
                tracing::warn!(
                    tenant_id = %tenant.id,
                    "Rejecting webhook: tenant has no webhook secret configured"
                );
                return Err(WebhookError::UnverifiedNotAcknowledged);
            }
        }

        // 3. Redelivery
        if let Some(webhook_id) = request.webhook_id
            && store.webhook_processed(tenant.id, webhook_id).await?
        {
            tracing::info!(tenant_id = %tenant.id, "Skipping already processed webhook delivery");
            return Ok(WebhookOutcome {
                tenant_id: tenant.id,
                duplicate: true,
            });
        }

        // 4. Parse and reconcile
        self.route(tenant.id, request.topic, request.body).await?;

        // 5. Record
        if let Some(webhook_id) = request.webhook_id {
            store
                .record_webhook(tenant.id, webhook_id, request.topic.as_str())
                .await?;
        }

        tracing::info!(tenant_id = %tenant.id, "Webhook processed");

        Ok(WebhookOutcome {
            tenant_id: tenant.id,
            duplicate: false,
        })
    }

    async fn route(
        &self,
        tenant: TenantId,
        topic: WebhookTopic,
        body: &[u8],
    ) -> Result<(), WebhookError> {
        let invalid = |e: serde_json::Error| WebhookError::InvalidPayload(e.to_string());

        match topic.resource() {
            ResourceType::Customers => {
                let payload: ShopifyCustomer = serde_json::from_slice(body).map_err(invalid)?;
                self.reconciler.reconcile_customer(tenant, &payload).await?;
            }
            ResourceType::Products => {
                let payload: ShopifyProduct = serde_json::from_slice(body).map_err(invalid)?;
                self.reconciler.reconcile_product(tenant, &payload).await?;
            }
            ResourceType::Orders => {
                let payload: ShopifyOrder = serde_json::from_slice(body).map_err(invalid)?;
                self.reconciler
                    .reconcile_order(tenant, &payload, ReconcileOptions::webhook())
                    .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::json;

    use crate::db::{MemoryStore, Store};
    use crate::models::NewTenant;

    const SECRET: &str = "whsec_test_secret";

    async fn setup(secret: Option<&str>, allow_unverified: bool) -> (Arc<MemoryStore>, WebhookDispatcher, TenantId) {
        let store = Arc::new(MemoryStore::new());
        let tenant = store
            .create_tenant(&NewTenant {
                name: "Acme".to_string(),
                shop_domain: ShopDomain::parse("acme").unwrap(),
                access_token: None,
                webhook_secret: secret.map(SecretString::from),
                allow_unverified_webhooks: allow_unverified,
            })
            .await
            .unwrap();
        let dispatcher = WebhookDispatcher::new(Reconciler::new(store.clone()));
        (store, dispatcher, tenant.id)
    }

    fn customer_body() -> Vec<u8> {
        serde_json::to_vec(&json!({ "id": 42, "email": "ann@example.com", "total_spent": "10.00" }))
            .unwrap()
    }

    fn request<'a>(body: &'a [u8], signature: Option<&'a str>, webhook_id: Option<&'a str>) -> WebhookRequest<'a> {
        WebhookRequest {
            topic: WebhookTopic::CustomersCreate,
            shop_domain: Some("acme.myshopify.com"),
            signature,
            webhook_id,
            body,
        }
    }

    #[test]
    fn test_topic_paths() {
        for topic in WebhookTopic::ALL {
            let (resource, event) = topic.as_str().split_once('/').unwrap();
            assert_eq!(WebhookTopic::from_path(resource, event), Some(topic));
        }
        assert_eq!(WebhookTopic::from_path("orders", "update"), None);
        assert_eq!(WebhookTopic::from_path("collections", "create"), None);
    }

    #[tokio::test]
    async fn test_signed_webhook_is_reconciled() {
        let (store, dispatcher, tenant) = setup(Some(SECRET), false).await;
        let body = customer_body();
        let sig = signature::sign(&body, &SecretString::from(SECRET));

        let outcome = dispatcher.dispatch(request(&body, Some(&sig), Some("d-1"))).await.unwrap();
        assert!(!outcome.duplicate);

        let customers = store.customers(tenant).await;
        assert_eq!(customers.len(), 1);
        assert_eq!(customers.first().unwrap().total_spent, Decimal::new(1000, 2));
    }

    #[tokio::test]
    async fn test_missing_signature_is_rejected_without_writes() {
        let (store, dispatcher, _) = setup(Some(SECRET), false).await;
        let before = store.mutation_count().await;
        let body = customer_body();

        let err = dispatcher.dispatch(request(&body, None, None)).await.unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignature));
        assert_eq!(store.mutation_count().await, before);
    }

    #[tokio::test]
    async fn test_unknown_shop_is_not_found() {
        let (_, dispatcher, _) = setup(Some(SECRET), false).await;
        let body = customer_body();
        let mut req = request(&body, None, None);
        req.shop_domain = Some("other.myshopify.com");
        assert!(matches!(
            dispatcher.dispatch(req).await.unwrap_err(),
            WebhookError::TenantNotFound(_)
        ));

        req.shop_domain = None;
        assert!(matches!(
            dispatcher.dispatch(req).await.unwrap_err(),
            WebhookError::TenantNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_unsigned_mode_requires_acknowledgment() {
        let (store, dispatcher, tenant) = setup(None, false).await;
        let body = customer_body();
        assert!(matches!(
            dispatcher.dispatch(request(&body, None, None)).await.unwrap_err(),
            WebhookError::UnverifiedNotAcknowledged
        ));
        assert!(store.customers(tenant).await.is_empty());

        let (store, dispatcher, tenant) = setup(None, true).await;
        dispatcher.dispatch(request(&body, None, None)).await.unwrap();
        assert_eq!(store.customers(tenant).await.len(), 1);
    }

    #[tokio::test]
    async fn test_redelivery_is_skipped() {
        let (store, dispatcher, _) = setup(None, true).await;
        let body = customer_body();

        dispatcher.dispatch(request(&body, None, Some("d-1"))).await.unwrap();
        let after_first = store.mutation_count().await;

        let outcome = dispatcher.dispatch(request(&body, None, Some("d-1"))).await.unwrap();
        assert!(outcome.duplicate);
        assert_eq!(store.mutation_count().await, after_first);
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_and_not_recorded() {
        let (store, dispatcher, tenant) = setup(None, true).await;
        let err = dispatcher
            .dispatch(request(b"{not json", None, Some("d-9")))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));
        assert!(!store.webhook_processed(tenant, "d-9").await.unwrap());
    }
}
