//! CLI command implementations.

pub mod migrate;
pub mod sync;
pub mod tenant;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use shop_insights_core::ShopDomain;
use shop_insights_ingest::config::{ConfigError, get_database_url, validate_secret_strength};
use shop_insights_ingest::db::{PgStore, RepositoryError, Store, create_pool};
use shop_insights_ingest::models::Tenant;
use shop_insights_ingest::shopify::ShopifyError;
use shop_insights_ingest::sync::SyncError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Shopify API call failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// Full sync aborted.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No tenant for the given domain.
    #[error("No tenant for shop domain: {0}")]
    TenantNotFound(String),
}

/// Connect to the ingest database.
async fn connect() -> Result<PgStore, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("INGEST_DATABASE_URL")?;

    tracing::info!("Connecting to ingest database...");
    let pool = create_pool(&database_url).await?;
    Ok(PgStore::new(pool))
}

fn parse_domain(domain: &str) -> Result<ShopDomain, CommandError> {
    ShopDomain::parse(domain).map_err(|e| CommandError::InvalidArgument(e.to_string()))
}

/// Load a tenant by shop domain or handle.
async fn tenant_by_domain(store: &PgStore, domain: &str) -> Result<Tenant, CommandError> {
    let domain = parse_domain(domain)?;
    store
        .tenant_by_domain(&domain)
        .await?
        .ok_or_else(|| CommandError::TenantNotFound(domain.to_string()))
}

/// Wrap a non-blank argument as a secret.
fn secret_arg(name: &str, value: Option<String>) -> Result<Option<SecretString>, CommandError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(CommandError::InvalidArgument(format!(
            "{name} must not be blank"
        ))),
        Some(v) => Ok(Some(SecretString::from(v.trim().to_owned()))),
        None => Ok(None),
    }
}

/// Like [`secret_arg`], but also rejects placeholder and low-entropy secrets.
fn webhook_secret_arg(value: Option<String>) -> Result<Option<SecretString>, CommandError> {
    let secret = secret_arg("--webhook-secret", value)?;
    if let Some(secret) = &secret {
        validate_secret_strength(secret.expose_secret(), "--webhook-secret")?;
    }
    Ok(secret)
}
