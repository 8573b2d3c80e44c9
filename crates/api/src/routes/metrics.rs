//! Cycle-time and review-time metrics over a window of PRs

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use processor::quality::{ReviewBottleneck, ReviewEfficiencyAnalysis};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::presenters::{render, CycleTimeStatisticsView};
use crate::query::MetricsQuery;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ReviewTimeResponse {
    pub efficiency: ReviewEfficiencyAnalysis,
    pub bottlenecks: Vec<ReviewBottleneck>,
}

/// GET /api/metrics/cycle_time
pub async fn cycle_time(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let filter = query.resolve(Utc::now())?;
    let prs = super::load(&state, &filter).await?;

    let stats = state.service.cycle_time().calculate_statistics(prs.iter());
    render(&CycleTimeStatisticsView::from(&stats))
}

/// GET /api/metrics/review_time
pub async fn review_time(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<ReviewTimeResponse>> {
    let filter = query.resolve(Utc::now())?;
    let prs = super::load(&state, &filter).await?;

    let quality = state.service.quality();
    Ok(Json(ReviewTimeResponse {
        efficiency: quality.analyze_review_efficiency(prs.iter()),
        bottlenecks: quality.analyze_review_bottlenecks(prs.iter()),
    }))
}
