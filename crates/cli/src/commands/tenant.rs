//! Tenant management commands.
//!
//! # Usage
//!
//! ```bash
//! # Onboard a store (token and secret may also come from the environment)
//! si-cli tenant create -n "Acme" -d acme --access-token shpat_... --webhook-secret ...
//!
//! # Rotate credentials
//! si-cli tenant set-credentials acme --access-token shpat_...
//!
//! # Stop accepting unsigned webhooks
//! si-cli tenant set-credentials acme --allow-unverified-webhooks false
//!
//! # List tenants
//! si-cli tenant list
//! ```

use shop_insights_ingest::db::Store;
use shop_insights_ingest::models::{NewTenant, Tenant, TenantCredentials, WebhookVerification};

use super::{
    CommandError, connect, parse_domain, secret_arg, tenant_by_domain, webhook_secret_arg,
};

/// Human-readable webhook authentication mode.
fn verification_label(tenant: &Tenant) -> &'static str {
    match tenant.webhook_verification() {
        WebhookVerification::Signed(_) => "signed",
        WebhookVerification::UnverifiedAcknowledged => "unverified (acknowledged)",
        WebhookVerification::Refused => "refused (no secret)",
    }
}

/// Onboard a new tenant.
///
/// # Returns
///
/// The created tenant.
pub async fn create(
    name: &str,
    domain: &str,
    access_token: Option<String>,
    webhook_secret: Option<String>,
    allow_unverified_webhooks: bool,
) -> Result<Tenant, CommandError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::InvalidArgument(
            "tenant name must not be blank".to_owned(),
        ));
    }

    let new_tenant = NewTenant {
        name: name.to_owned(),
        shop_domain: parse_domain(domain)?,
        access_token: secret_arg("--access-token", access_token)?,
        webhook_secret: webhook_secret_arg(webhook_secret)?,
        allow_unverified_webhooks,
    };

    let store = connect().await?;
    let tenant = store.create_tenant(&new_tenant).await?;

    tracing::info!(
        "Tenant created successfully! ID: {}, Domain: {}, Webhooks: {}",
        tenant.id,
        tenant.shop_domain,
        verification_label(&tenant)
    );
    if tenant.access_token.is_none() {
        tracing::warn!(
            "Note: Tenant has no access token. Full sync is unavailable until 'tenant set-credentials --access-token' is run."
        );
    }
    if matches!(
        tenant.webhook_verification(),
        WebhookVerification::UnverifiedAcknowledged
    ) {
        tracing::warn!("Note: Unsigned webhooks will be accepted for this tenant.");
    }

    Ok(tenant)
}

/// Update a tenant's credentials. Omitted values are left unchanged.
pub async fn set_credentials(
    domain: &str,
    access_token: Option<String>,
    webhook_secret: Option<String>,
    allow_unverified_webhooks: Option<bool>,
) -> Result<Tenant, CommandError> {
    let credentials = TenantCredentials {
        access_token: secret_arg("--access-token", access_token)?,
        webhook_secret: webhook_secret_arg(webhook_secret)?,
        allow_unverified_webhooks,
    };
    if credentials.access_token.is_none()
        && credentials.webhook_secret.is_none()
        && credentials.allow_unverified_webhooks.is_none()
    {
        return Err(CommandError::InvalidArgument(
            "nothing to update".to_owned(),
        ));
    }

    let store = connect().await?;
    let tenant = tenant_by_domain(&store, domain).await?;
    let tenant = store
        .update_tenant_credentials(tenant.id, &credentials)
        .await?;

    tracing::info!(
        "Credentials updated for tenant {} ({}). Webhooks: {}",
        tenant.id,
        tenant.shop_domain,
        verification_label(&tenant)
    );
    Ok(tenant)
}

/// List all tenants.
pub async fn list() -> Result<(), CommandError> {
    let store = connect().await?;
    let tenants = store.list_tenants().await?;

    if tenants.is_empty() {
        tracing::info!("No tenants.");
        return Ok(());
    }

    for tenant in &tenants {
        tracing::info!(
            "{:>4}  {:<40}  {:<24}  token: {:<3}  webhooks: {}",
            tenant.id,
            tenant.shop_domain,
            tenant.name,
            if tenant.access_token.is_some() { "yes" } else { "no" },
            verification_label(tenant)
        );
    }
    Ok(())
}
