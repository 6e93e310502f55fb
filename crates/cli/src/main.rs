//! Shop Insights CLI - Database migrations and tenant management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run ingest database migrations
//! si-cli migrate
//!
//! # Onboard a store
//! si-cli tenant create -n "Acme" -d acme.myshopify.com --access-token shpat_...
//!
//! # Rotate a webhook secret
//! si-cli tenant set-credentials acme --webhook-secret ...
//!
//! # Re-run a full sync, optionally resuming from a cursor
//! si-cli sync acme orders --resume-from eyJsYXN0X2lk...
//!
//! # Verify a tenant's API token
//! si-cli check-connection acme
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `tenant` - Create, update and list tenants
//! - `sync` - Run a full sync for one resource or all of them
//! - `check-connection` - Fetch shop info with the stored token

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "si-cli")]
#[command(author, version, about = "Shop Insights CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage tenants
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
    /// Run a full sync for a tenant
    Sync {
        /// Shop domain or handle (e.g. `acme` or `acme.myshopify.com`)
        domain: String,

        /// Resource to sync (`customers`, `products`, `orders` or `all`)
        #[arg(default_value = "all")]
        resource: String,

        /// Cursor reported by an aborted run
        #[arg(long)]
        resume_from: Option<String>,
    },
    /// Verify a tenant's API token by fetching shop info
    CheckConnection {
        /// Shop domain or handle
        domain: String,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// Onboard a new tenant
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Shop domain or handle
        #[arg(short, long)]
        domain: String,

        /// REST Admin API access token
        #[arg(long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// Shared secret for webhook signatures
        #[arg(long, env = "SHOPIFY_WEBHOOK_SECRET", hide_env_values = true)]
        webhook_secret: Option<String>,

        /// Accept unsigned webhooks while no secret is configured
        #[arg(long)]
        allow_unverified_webhooks: bool,
    },
    /// Update a tenant's credentials
    SetCredentials {
        /// Shop domain or handle
        domain: String,

        /// New REST Admin API access token
        #[arg(long)]
        access_token: Option<String>,

        /// New shared secret for webhook signatures
        #[arg(long)]
        webhook_secret: Option<String>,

        /// Accept (`true`) or refuse (`false`) unsigned webhooks
        #[arg(long)]
        allow_unverified_webhooks: Option<bool>,
    },
    /// List tenants
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Tenant { action } => match action {
            TenantAction::Create {
                name,
                domain,
                access_token,
                webhook_secret,
                allow_unverified_webhooks,
            } => {
                commands::tenant::create(
                    &name,
                    &domain,
                    access_token,
                    webhook_secret,
                    allow_unverified_webhooks,
                )
                .await?;
            }
            TenantAction::SetCredentials {
                domain,
                access_token,
                webhook_secret,
                allow_unverified_webhooks,
            } => {
                commands::tenant::set_credentials(
                    &domain,
                    access_token,
                    webhook_secret,
                    allow_unverified_webhooks,
                )
                .await?;
            }
            TenantAction::List => commands::tenant::list().await?,
        },
        Commands::Sync {
            domain,
            resource,
            resume_from,
        } => commands::sync::run(&domain, &resource, resume_from).await?,
        Commands::CheckConnection { domain } => commands::sync::check_connection(&domain).await?,
    }
    Ok(())
}
