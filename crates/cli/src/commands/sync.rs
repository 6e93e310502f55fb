//! Manual full sync and connection check.
//!
//! # Usage
//!
//! ```bash
//! # Sync everything, in dependency order
//! si-cli sync acme
//!
//! # Resume an aborted orders sync
//! si-cli sync acme orders --resume-from <cursor>
//!
//! # Check the stored token
//! si-cli check-connection acme
//! ```
//!
//! # Environment Variables
//!
//! - `INGEST_DATABASE_URL` - `PostgreSQL` connection string
//! - `SHOPIFY_API_VERSION`, `SHOPIFY_PAGE_LIMIT`, `SHOPIFY_REQUEST_TIMEOUT_SECS`

use std::sync::Arc;

use shop_insights_core::ResourceType;
use shop_insights_ingest::config::ShopifyApiConfig;
use shop_insights_ingest::reconcile::Reconciler;
use shop_insights_ingest::shopify::{Cursor, ShopifyClient};
use shop_insights_ingest::sync::{FullSync, SyncError, SyncSummary};

use super::{CommandError, connect, tenant_by_domain};

fn log_summary(summary: &SyncSummary) {
    tracing::info!(
        "{}: {} pages, {} fetched, {} reconciled, {} failed",
        summary.resource,
        summary.pages,
        summary.fetched,
        summary.reconciled,
        summary.failed
    );
}

/// Run a full sync for one resource, or for all of them when `resource` is `all`.
pub async fn run(
    domain: &str,
    resource: &str,
    resume_from: Option<String>,
) -> Result<(), CommandError> {
    let resource = if resource.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(
            resource
                .parse::<ResourceType>()
                .map_err(|e| CommandError::InvalidArgument(e.to_string()))?,
        )
    };
    if resource.is_none() && resume_from.is_some() {
        return Err(CommandError::InvalidArgument(
            "--resume-from needs a single resource".to_owned(),
        ));
    }

    let store = connect().await?;
    let tenant = tenant_by_domain(&store, domain).await?;
    let client = ShopifyClient::new(&ShopifyApiConfig::from_env()?)?;
    let sync = FullSync::new(Arc::new(client), Reconciler::new(Arc::new(store)));

    tracing::info!("Syncing {} (tenant {})...", tenant.shop_domain, tenant.id);

    let result = match resource {
        Some(resource) => sync
            .run(tenant.id, resource, resume_from.map(Cursor::new))
            .await
            .map(|summary| vec![summary]),
        None => sync.run_all(tenant.id).await,
    };

    match result {
        Ok(summaries) => {
            summaries.iter().for_each(log_summary);
            tracing::info!("Sync complete!");
            Ok(())
        }
        Err(err) => {
            report_abort(&err);
            Err(err.into())
        }
    }
}

fn report_abort(err: &SyncError) {
    if let Some(progress) = err.progress() {
        log_summary(progress);
    }
    if let Some(cursor) = err.resume_from() {
        tracing::warn!(
            "Sync aborted. Resume with: si-cli sync <domain> {} --resume-from {}",
            err.progress().map_or("<resource>", |p| p.resource.as_str()),
            cursor
        );
    }
}

/// Verify a tenant's stored token by fetching shop info.
pub async fn check_connection(domain: &str) -> Result<(), CommandError> {
    let store = connect().await?;
    let tenant = tenant_by_domain(&store, domain).await?;
    let credential = tenant.credential().ok_or_else(|| {
        CommandError::InvalidArgument(format!("tenant {} has no access token", tenant.id))
    })?;

    let client = ShopifyClient::new(&ShopifyApiConfig::from_env()?)?;
    let shop = client.shop_info(&credential).await?;

    tracing::info!(
        "Connected to {} ({}) - email: {}, currency: {}, timezone: {}",
        shop.name,
        shop.myshopify_domain.as_deref().unwrap_or(tenant.shop_domain.as_str()),
        shop.email.as_deref().unwrap_or("-"),
        shop.currency.as_deref().unwrap_or("-"),
        shop.iana_timezone.as_deref().unwrap_or("-")
    );
    Ok(())
}
