//! Pull request endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use processor::analysis::PrInsights;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ApiResult, DbResultExt, OptionExt};
use crate::presenters::{render, PrMetricsView, PrSummaryView};
use crate::query::MetricsQuery;
use crate::state::AppState;

#[derive(Serialize)]
struct PrListResponse<'a> {
    total: usize,
    pull_requests: Vec<PrSummaryView<'a>>,
}

/// List PRs in the window, most recent first
/// GET /api/pull_requests
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let filter = query.resolve(Utc::now())?;
    let prs = super::load(&state, &filter).await?;

    let limit = filter.limit.unwrap_or(prs.len());
    render(&PrListResponse {
        total: prs.len(),
        pull_requests: prs.iter().rev().take(limit).map(PrSummaryView::from).collect(),
    })
}

/// GET /api/pull_requests/:id/metrics
pub async fn metrics(
    State(state): State<Arc<AppState>>,
    Path(pr_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let metrics = db::pr_metrics::get_by_pr_id(&state.pool, &pr_id)
        .await
        .db_err()?
        .not_found(format!("pull request {}", pr_id))?;

    render(&PrMetricsView::from(&metrics))
}

/// GET /api/pull_requests/:id/insights
pub async fn insights(
    State(state): State<Arc<AppState>>,
    Path(pr_id): Path<String>,
) -> ApiResult<Json<PrInsights>> {
    let metrics = db::pr_metrics::get_by_pr_id(&state.pool, &pr_id)
        .await
        .db_err()?
        .not_found(format!("pull request {}", pr_id))?;

    Ok(Json(state.service.generate_insights(&metrics)))
}
