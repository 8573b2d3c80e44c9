//! API routes

use common::models::PrMetrics;

use crate::error::{ApiResult, DbResultExt};
use crate::query::MetricsFilter;
use crate::state::AppState;

pub mod analytics;
pub mod collect;
pub mod health;
pub mod metrics;
pub mod pull_requests;

/// Stored PR metrics matching a filter, oldest first
async fn load(state: &AppState, filter: &MetricsFilter) -> ApiResult<Vec<PrMetrics>> {
    db::pr_metrics::list_by_date_range(
        &state.pool,
        filter.start,
        filter.end,
        &filter.developers,
        &filter.repositories,
    )
    .await
    .db_err()
}
