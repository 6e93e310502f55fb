//! Full sync: pull a whole resource collection and reconcile it.
//!
//! Pages are pulled lazily, one at a time, and each page is reconciled item
//! by item before the next page is requested, so memory stays bounded by the
//! page size. Items are processed sequentially to stay within the
//! platform's rate limits.
//!
//! A failing item is logged and counted; the run continues. A failing page
//! aborts the run: the error carries the progress so far and the cursor of
//! the page that failed, which can be passed back to resume.

use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use shop_insights_core::{ResourceType, TenantId};

use crate::db::RepositoryError;
use crate::models::{StoreCredential, Tenant};
use crate::reconcile::{ReconcileOptions, Reconciler};
use crate::shopify::{Cursor, Page, PageSource, ShopifyError};

/// Counts for one resource sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub tenant_id: TenantId,
    pub resource: ResourceType,
    /// Cursor the run started from (`None` for the first page).
    pub started_from: Option<Cursor>,
    pub pages: usize,
    pub fetched: usize,
    pub reconciled: usize,
    pub failed: usize,
}

impl SyncSummary {
    const fn new(tenant_id: TenantId, resource: ResourceType, started_from: Option<Cursor>) -> Self {
        Self {
            tenant_id,
            resource,
            started_from,
            pages: 0,
            fetched: 0,
            reconciled: 0,
            failed: 0,
        }
    }
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("tenant {0} not found")]
    TenantNotFound(TenantId),

    #[error("tenant {0} has no access token")]
    MissingCredential(TenantId),

    /// The platform rejected the tenant's credential.
    #[error("authentication failed syncing {}: {source}", .progress.resource)]
    Authentication {
        source: ShopifyError,
        progress: Box<SyncSummary>,
        resume_from: Option<Cursor>,
    },

    /// A page fetch failed (network, 5xx, rate limit, bad body).
    #[error("page fetch failed syncing {} after {} pages: {source}", .progress.resource, .progress.pages)]
    ExternalService {
        source: ShopifyError,
        progress: Box<SyncSummary>,
        resume_from: Option<Cursor>,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SyncError {
    /// Progress made before the run aborted, if it got as far as fetching.
    #[must_use]
    pub fn progress(&self) -> Option<&SyncSummary> {
        match self {
            Self::Authentication { progress, .. } | Self::ExternalService { progress, .. } => {
                Some(&**progress)
            }
            _ => None,
        }
    }

    /// Cursor of the page that failed; pass it back to resume the run.
    #[must_use]
    pub fn resume_from(&self) -> Option<&Cursor> {
        match self {
            Self::Authentication { resume_from, .. }
            | Self::ExternalService { resume_from, .. } => resume_from.as_ref(),
            _ => None,
        }
    }
}

/// Lazy sequence of pages, starting at `start` and following next cursors
/// until the last page. Stops after the first error.
pub fn pages<'a>(
    source: &'a dyn PageSource,
    credential: &'a StoreCredential,
    resource: ResourceType,
    start: Option<Cursor>,
) -> impl Stream<Item = Result<Page, ShopifyError>> + Send + 'a {
    stream! {
        let mut cursor = start;
        loop {
            match source.fetch_page(credential, resource, cursor.as_ref()).await {
                Ok(page) => {
                    let next = page.next_cursor.clone();
                    yield Ok(page);
                    match next {
                        Some(next) => cursor = Some(next),
                        None => break,
                    }
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
}

/// Full sync orchestrator.
#[derive(Clone)]
pub struct FullSync {
    source: Arc<dyn PageSource>,
    reconciler: Reconciler,
}

impl FullSync {
    #[must_use]
    pub fn new(source: Arc<dyn PageSource>, reconciler: Reconciler) -> Self {
        Self { source, reconciler }
    }

    /// Sync one resource for a tenant, optionally resuming from a cursor.
    ///
    /// # Errors
    ///
    /// - `TenantNotFound` / `MissingCredential` before any request is made
    /// - `Authentication` if the platform rejects the credential
    /// - `ExternalService` if a page cannot be fetched
    /// - `Repository` if the tenant lookup fails
    pub async fn run(
        &self,
        tenant_id: TenantId,
        resource: ResourceType,
        resume_from: Option<Cursor>,
    ) -> Result<SyncSummary, SyncError> {
        let tenant = self.tenant(tenant_id).await?;
        let credential = tenant
            .credential()
            .ok_or(SyncError::MissingCredential(tenant_id))?;
        self.run_resource(&tenant, &credential, resource, resume_from)
            .await
    }

    /// Sync every resource for a tenant, in dependency order.
    ///
    /// Stops at the first aborted resource.
    ///
    /// # Errors
    ///
    /// Same as [`FullSync::run`].
    pub async fn run_all(&self, tenant_id: TenantId) -> Result<Vec<SyncSummary>, SyncError> {
        let tenant = self.tenant(tenant_id).await?;
        let credential = tenant
            .credential()
            .ok_or(SyncError::MissingCredential(tenant_id))?;

        let mut summaries = Vec::with_capacity(ResourceType::ALL.len());
        for resource in ResourceType::ALL {
            summaries.push(
                self.run_resource(&tenant, &credential, resource, None)
                    .await?,
            );
        }
        Ok(summaries)
    }

    async fn tenant(&self, tenant_id: TenantId) -> Result<Tenant, SyncError> {
        self.reconciler
            .store()
            .tenant_by_id(tenant_id)
            .await?
            .ok_or(SyncError::TenantNotFound(tenant_id))
    }

    #[instrument(
        skip(self, tenant, credential, resume_from),
        fields(tenant_id = %tenant.id, resource = %resource, resumed = resume_from.is_some())
    )]
    async fn run_resource(
        &self,
        tenant: &Tenant,
        credential: &StoreCredential,
        resource: ResourceType,
        resume_from: Option<Cursor>,
    ) -> Result<SyncSummary, SyncError> {
        let options = ReconcileOptions::full_sync();
        let mut summary = SyncSummary::new(tenant.id, resource, resume_from.clone());
        let mut current = resume_from.clone();

        tracing::info!("Starting full sync");

        let mut page_stream = std::pin::pin!(pages(
            self.source.as_ref(),
            credential,
            resource,
            resume_from
        ));

        while let Some(result) = page_stream.next().await {
            let page = match result {
                Ok(page) => page,
                Err(source) => {
                    let progress = Box::new(summary);
                    let resume_from = current;
                    if source.is_authentication() {
                        tracing::error!(error = %source, "Full sync aborted: credential rejected");
                        return Err(SyncError::Authentication {
                            source,
                            progress,
                            resume_from,
                        });
                    }
                    tracing::error!(error = %source, resume_from = ?resume_from, "Full sync aborted: page fetch failed");
                    return Err(SyncError::ExternalService {
                        source,
                        progress,
                        resume_from,
                    });
                }
            };

            summary.pages += 1;
            summary.fetched += page.items.len();

            for item in page.items {
                let external_id = item_id(&item);
                match self
                    .reconciler
                    .reconcile_raw(tenant.id, resource, item, options)
                    .await
                {
                    Ok(_) => summary.reconciled += 1,
                    Err(e) => {
                        summary.failed += 1;
                        tracing::warn!(
                            external_id = external_id.as_deref().unwrap_or("<missing>"),
                            error = %e,
                            "Skipping item that failed to reconcile"
                        );
                    }
                }
            }

            current = page.next_cursor;
        }

        tracing::info!(
            pages = summary.pages,
            fetched = summary.fetched,
            reconciled = summary.reconciled,
            failed = summary.failed,
            "Full sync complete"
        );

        Ok(summary)
    }
}

/// The item's `id` for logging: strings as-is, numbers in decimal.
fn item_id(item: &serde_json::Value) -> Option<String> {
    item.get("id").map(|id| {
        id.as_str()
            .map_or_else(|| id.to_string(), ToString::to_string)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;

    use shop_insights_core::ShopDomain;

    use crate::db::{MemoryStore, Store};
    use crate::models::NewTenant;
    use crate::shopify::ScriptedSource;

    fn customers_page(ids: std::ops::Range<u64>, next: Option<&str>) -> Page {
        Page {
            items: ids.map(|id| json!({ "id": id, "email": format!("c{id}@example.com") })).collect(),
            next_cursor: next.map(Cursor::new),
        }
    }

    async fn setup(source: ScriptedSource, token: bool) -> (Arc<MemoryStore>, Arc<ScriptedSource>, FullSync, TenantId) {
        let store = Arc::new(MemoryStore::new());
        let tenant = store
            .create_tenant(&NewTenant {
                name: "Acme".to_string(),
                shop_domain: ShopDomain::parse("acme").unwrap(),
                access_token: token.then(|| SecretString::from("shpat_test")),
                webhook_secret: None,
                allow_unverified_webhooks: false,
            })
            .await
            .unwrap();
        let source = Arc::new(source);
        let sync = FullSync::new(source.clone(), Reconciler::new(store.clone()));
        (store, source, sync, tenant.id)
    }

    #[tokio::test]
    async fn test_follows_cursors_until_last_page() {
        let (store, source, sync, tenant) = setup(
            ScriptedSource::new(vec![
                Ok(customers_page(0..3, Some("p2"))),
                Ok(customers_page(3..5, None)),
            ]),
            true,
        )
        .await;

        let summary = sync.run(tenant, ResourceType::Customers, None).await.unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.fetched, 5);
        assert_eq!(summary.reconciled, 5);
        assert_eq!(store.customers(tenant).await.len(), 5);
        assert_eq!(
            source.requested().await,
            vec![None, Some(Cursor::new("p2"))]
        );
    }

    #[tokio::test]
    async fn test_bad_item_is_skipped() {
        let mut page = customers_page(0..2, None);
        page.items.insert(1, json!({ "email": "no-id@example.com" }));
        let (store, _, sync, tenant) = setup(ScriptedSource::new(vec![Ok(page)]), true).await;

        let summary = sync.run(tenant, ResourceType::Customers, None).await.unwrap();
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.reconciled, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.customers(tenant).await.len(), 2);
    }

    #[tokio::test]
    async fn test_page_failure_reports_resume_cursor() {
        let (_, _, sync, tenant) = setup(
            ScriptedSource::new(vec![
                Ok(customers_page(0..2, Some("p2"))),
                Err(ShopifyError::Status {
                    status: 502,
                    body: "bad gateway".into(),
                }),
            ]),
            true,
        )
        .await;

        let err = sync.run(tenant, ResourceType::Customers, None).await.unwrap_err();
        assert!(matches!(err, SyncError::ExternalService { .. }));
        assert_eq!(err.resume_from(), Some(&Cursor::new("p2")));
        assert_eq!(err.progress().unwrap().reconciled, 2);
    }

    #[tokio::test]
    async fn test_resume_starts_at_cursor() {
        let (_, source, sync, tenant) =
            setup(ScriptedSource::new(vec![Ok(customers_page(2..4, None))]), true).await;

        let summary = sync
            .run(tenant, ResourceType::Customers, Some(Cursor::new("p2")))
            .await
            .unwrap();
        assert_eq!(summary.started_from, Some(Cursor::new("p2")));
        assert_eq!(source.requested().await, vec![Some(Cursor::new("p2"))]);
    }

    #[tokio::test]
    async fn test_rejected_credential_aborts() {
        let (_, _, sync, tenant) = setup(
            ScriptedSource::new(vec![Err(ShopifyError::Unauthorized("revoked".into()))]),
            true,
        )
        .await;

        let err = sync.run(tenant, ResourceType::Products, None).await.unwrap_err();
        assert!(matches!(err, SyncError::Authentication { .. }));
        assert_eq!(err.resume_from(), None);
    }

    #[test]
    fn test_item_id_is_unquoted() {
        assert_eq!(item_id(&json!({ "id": "gid-abc" })).as_deref(), Some("gid-abc"));
        assert_eq!(item_id(&json!({ "id": 450_789_469 })).as_deref(), Some("450789469"));
        assert_eq!(item_id(&json!({ "title": "no id" })), None);
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_requests() {
        let (_, source, sync, tenant) = setup(ScriptedSource::default(), false).await;

        let err = sync.run(tenant, ResourceType::Orders, None).await.unwrap_err();
        assert!(matches!(err, SyncError::MissingCredential(_)));
        assert!(source.requested().await.is_empty());
    }
}
