//! PostgreSQL storage for PR metrics and their rollups
//!
//! Two tables back the sink:
//! - `pr_metrics`: one row per PR keyed by `pr_id`, with the author,
//!   repository, size and complexity columns indexed and the full record
//!   kept as a JSONB blob
//! - `aggregated_metrics`: team, developer and repository rollups keyed by
//!   level, period, target and date range, carrying a `version` bumped on
//!   every overwrite

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

pub mod aggregated;
pub mod pr_metrics;

/// Pool size shared by the API handlers and the background sync
const MAX_CONNECTIONS: u32 = 10;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;
    info!("Connected to metrics database ({} connections max)", MAX_CONNECTIONS);
    Ok(pool)
}

/// Create `pr_metrics`, `aggregated_metrics` and their indexes if missing
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(include_str!("../../../migrations/001_initial.sql"))
        .execute(pool)
        .await?;
    info!("Metrics schema ready");
    Ok(())
}
