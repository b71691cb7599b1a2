// Postgres implementations of the citewatch repositories.

mod citations;
mod findings;
mod retractions;

use std::time::Duration;

use citewatch_common::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

pub use citations::PgCitationStore;
pub use findings::PgFindingStore;
pub use retractions::PgRetractionCache;

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a connection pool against `database_url`.
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;
    info!(max_connections = MAX_CONNECTIONS, "Connected to Postgres");
    Ok(pool)
}

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(())
}
