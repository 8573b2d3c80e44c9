//! Team, developer and repository rollups
//!
//! Rollups are computed from stored PR metrics on each request and saved
//! through the aggregated metrics store. With `cached=true` the team,
//! single-developer and single-repository endpoints return the newest stored
//! rollup lying inside the requested window, if there is one.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use common::rollups::{AggregationPeriod, DateRange, MetricsSummary, TrendAnalysisResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ApiResult, DbResultExt, OptionExt};
use crate::presenters::{render, DeveloperView, RepositoryView, TeamView};
use crate::query::MetricsQuery;
use crate::state::AppState;

#[derive(Serialize)]
pub struct TrendsResponse {
    pub period: AggregationPeriod,
    pub total_prs: usize,
    pub date_range: DateRange,
    pub trend_analysis: TrendAnalysisResult,
}

/// An empty window has no real date range to key the stored rollup on
fn is_storable(summary: &MetricsSummary) -> bool {
    summary.total_prs > 0
}

/// GET /api/analytics/team_metrics
pub async fn team_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let filter = query.resolve(Utc::now())?;
    if filter.cached {
        let stored = db::aggregated::find_team(&state.pool, filter.period, filter.start, filter.end)
            .await
            .db_err()?;
        if let Some(team) = stored {
            return render(&TeamView::from(&team));
        }
    }
    let prs = super::load(&state, &filter).await?;

    let team = state.aggregator.aggregate_team(&prs, filter.period);
    if is_storable(&team.summary) {
        let version = db::aggregated::save_team(&state.pool, &team)
            .await
            .db_err()?;
        debug!("Saved team rollup v{} over {} PRs", version, prs.len());
    }

    render(&TeamView::from(&team))
}

/// GET /api/analytics/developer_metrics
pub async fn developer_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let filter = query.resolve(Utc::now())?;
    let prs = super::load(&state, &filter).await?;

    let developers = state.aggregator.aggregate_developers(&prs, filter.period);
    for developer in developers.values() {
        db::aggregated::save_developer(&state.pool, developer)
            .await
            .db_err()?;
    }

    let views: Vec<DeveloperView> = developers.values().map(DeveloperView::from).collect();
    render(&views)
}

/// GET /api/analytics/developer_metrics/:developer
pub async fn developer(
    State(state): State<Arc<AppState>>,
    Path(developer): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut filter = query.resolve(Utc::now())?;
    if filter.cached {
        let stored = db::aggregated::find_developer(
            &state.pool,
            &developer,
            filter.period,
            filter.start,
            filter.end,
        )
        .await
        .db_err()?;
        if let Some(metrics) = stored {
            return render(&DeveloperView::from(&metrics));
        }
    }
    filter.developers = vec![developer.clone()];
    let prs = super::load(&state, &filter).await?;

    let metrics = state
        .aggregator
        .aggregate_developers(&prs, filter.period)
        .remove(&developer)
        .not_found(format!("pull requests by {}", developer))?;
    db::aggregated::save_developer(&state.pool, &metrics)
        .await
        .db_err()?;

    render(&DeveloperView::from(&metrics))
}

/// GET /api/analytics/repository_metrics
pub async fn repository_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let filter = query.resolve(Utc::now())?;
    let prs = super::load(&state, &filter).await?;

    let repositories = state.aggregator.aggregate_repositories(&prs, filter.period);
    for repository in repositories.values() {
        db::aggregated::save_repository(&state.pool, repository)
            .await
            .db_err()?;
    }

    let views: Vec<RepositoryView> = repositories.values().map(RepositoryView::from).collect();
    render(&views)
}

/// GET /api/analytics/repository_metrics/:repository
///
/// The repository is `owner/name` with the slash percent-encoded.
pub async fn repository(
    State(state): State<Arc<AppState>>,
    Path(repository): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut filter = query.resolve(Utc::now())?;
    if filter.cached {
        let stored = db::aggregated::find_repository(
            &state.pool,
            &repository,
            filter.period,
            filter.start,
            filter.end,
        )
        .await
        .db_err()?;
        if let Some(metrics) = stored {
            return render(&RepositoryView::from(&metrics));
        }
    }
    filter.repositories = vec![repository.clone()];
    let prs = super::load(&state, &filter).await?;

    let metrics = state
        .aggregator
        .aggregate_repositories(&prs, filter.period)
        .remove(&repository)
        .not_found(format!("pull requests in {}", repository))?;
    db::aggregated::save_repository(&state.pool, &metrics)
        .await
        .db_err()?;

    render(&RepositoryView::from(&metrics))
}

/// GET /api/analytics/trends
pub async fn trends(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<TrendsResponse>> {
    let filter = query.resolve(Utc::now())?;
    let prs = super::load(&state, &filter).await?;

    let summary = state.aggregator.aggregate_team(&prs, filter.period).summary;
    Ok(Json(TrendsResponse {
        period: summary.period,
        total_prs: summary.total_prs,
        date_range: summary.date_range,
        trend_analysis: summary.trend_analysis,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::models::{PrMetrics, QualityMetrics, SizeCategory, SizeMetrics, TimeMetrics};
    use processor::MetricsAggregator;

    #[test]
    fn test_empty_window_is_not_stored() {
        let aggregator = MetricsAggregator::default();
        let team = aggregator.aggregate_team(&[], AggregationPeriod::Weekly);
        assert_eq!(team.summary.total_prs, 0);
        assert!(!is_storable(&team.summary));
    }

    #[test]
    fn test_window_with_prs_is_stored() {
        let metrics = PrMetrics {
            pr_id: "1".to_string(),
            pr_number: 1,
            title: "Add cache".to_string(),
            author: "alice".to_string(),
            repository: "acme/api".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
            merged_at: None,
            size_metrics: SizeMetrics::default(),
            time_metrics: TimeMetrics::default(),
            quality_metrics: QualityMetrics::default(),
            complexity_score: 1.0,
            size_category: SizeCategory::XS,
        };
        let team = MetricsAggregator::default().aggregate_team(&[metrics], AggregationPeriod::Weekly);
        assert!(is_storable(&team.summary));
    }
}
