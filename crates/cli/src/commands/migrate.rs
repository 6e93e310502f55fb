//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! si-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `INGEST_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Ingest migrations: `crates/ingest/migrations/`

use super::{CommandError, connect};

/// Run ingest database migrations.
pub async fn run() -> Result<(), CommandError> {
    let store = connect().await?;

    tracing::info!("Running ingest migrations...");
    sqlx::migrate!("../ingest/migrations")
        .run(store.pool())
        .await?;

    tracing::info!("Ingest migrations complete!");
    Ok(())
}
