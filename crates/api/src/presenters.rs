//! JSON views with a stable field and unit contract
//!
//! Durations render as `{ seconds, formatted }`. Everything else passes
//! through in its stored shape.

use chrono::{DateTime, Duration, Utc};
use common::duration::{as_secs_f64, format_duration};
use common::models::{
    ComplexityLevel, PrMetrics, QualityMetrics, SizeCategory, SizeMetrics, TimeMetrics,
};
use common::rollups::{
    AggregationPeriod, Bottleneck, ComplexityStats, CycleTimeStats, DateRange, DeveloperMetrics,
    DurationStatistics, MetricsSummary, ProductivityMetrics, QualityStats, RepositoryMetrics,
    ReviewStats, SizeStats, TeamMetrics, TrendAnalysisResult,
};
use axum::Json;
use processor::cycle_time::CycleTimeStatistics;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Serialize a borrowed view into an owned response body
pub fn render<T: Serialize>(view: &T) -> ApiResult<Json<serde_json::Value>> {
    serde_json::to_value(view)
        .map(Json)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DurationView {
    pub seconds: f64,
    pub formatted: String,
}

pub fn duration(d: Duration) -> DurationView {
    DurationView {
        seconds: as_secs_f64(d),
        formatted: format_duration(d),
    }
}

fn optional(d: Option<Duration>) -> Option<DurationView> {
    d.map(duration)
}

#[derive(Serialize)]
pub struct TimeMetricsView {
    pub total_cycle_time: Option<DurationView>,
    pub time_to_first_review: Option<DurationView>,
    pub time_to_approval: Option<DurationView>,
    pub time_to_merge: Option<DurationView>,
    pub review_wait_time: Option<DurationView>,
    pub review_active_time: Option<DurationView>,
    pub created_hour: u32,
    pub merged_hour: Option<u32>,
}

impl From<&TimeMetrics> for TimeMetricsView {
    fn from(t: &TimeMetrics) -> Self {
        Self {
            total_cycle_time: optional(t.total_cycle_time),
            time_to_first_review: optional(t.time_to_first_review),
            time_to_approval: optional(t.time_to_approval),
            time_to_merge: optional(t.time_to_merge),
            review_wait_time: optional(t.review_wait_time),
            review_active_time: optional(t.review_active_time),
            created_hour: t.created_hour,
            merged_hour: t.merged_hour,
        }
    }
}

#[derive(Serialize)]
pub struct PrMetricsView<'a> {
    pub pr_id: &'a str,
    pub pr_number: i32,
    pub title: &'a str,
    pub author: &'a str,
    pub repository: &'a str,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub size_category: SizeCategory,
    pub complexity_score: f64,
    pub complexity_level: ComplexityLevel,
    pub review_efficiency: f64,
    pub is_large_pr: bool,
    pub is_high_quality: bool,
    pub dominant_file_type: String,
    pub size_metrics: &'a SizeMetrics,
    pub time_metrics: TimeMetricsView,
    pub quality_metrics: &'a QualityMetrics,
}

impl<'a> From<&'a PrMetrics> for PrMetricsView<'a> {
    fn from(m: &'a PrMetrics) -> Self {
        Self {
            pr_id: &m.pr_id,
            pr_number: m.pr_number,
            title: &m.title,
            author: &m.author,
            repository: &m.repository,
            created_at: m.created_at,
            merged_at: m.merged_at,
            size_category: m.size_category,
            complexity_score: m.complexity_score,
            complexity_level: m.complexity_level(),
            review_efficiency: m.review_efficiency(),
            is_large_pr: m.is_large_pr(),
            is_high_quality: m.is_high_quality(),
            dominant_file_type: m.dominant_file_type(),
            size_metrics: &m.size_metrics,
            time_metrics: TimeMetricsView::from(&m.time_metrics),
            quality_metrics: &m.quality_metrics,
        }
    }
}

/// Compact row for PR listings
#[derive(Serialize)]
pub struct PrSummaryView<'a> {
    pub pr_id: &'a str,
    pub pr_number: i32,
    pub title: &'a str,
    pub author: &'a str,
    pub repository: &'a str,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub lines_changed: i64,
    pub size_category: SizeCategory,
    pub complexity_score: f64,
    pub total_cycle_time: Option<DurationView>,
}

impl<'a> From<&'a PrMetrics> for PrSummaryView<'a> {
    fn from(m: &'a PrMetrics) -> Self {
        Self {
            pr_id: &m.pr_id,
            pr_number: m.pr_number,
            title: &m.title,
            author: &m.author,
            repository: &m.repository,
            created_at: m.created_at,
            merged_at: m.merged_at,
            lines_changed: m.size_metrics.lines_changed,
            size_category: m.size_category,
            complexity_score: m.complexity_score,
            total_cycle_time: optional(m.time_metrics.total_cycle_time),
        }
    }
}

#[derive(Serialize)]
pub struct DurationPercentilesView {
    pub p10: DurationView,
    pub p25: DurationView,
    pub p50: DurationView,
    pub p75: DurationView,
    pub p90: DurationView,
    pub p95: DurationView,
    pub p99: DurationView,
}

#[derive(Serialize)]
pub struct DurationStatsView {
    pub count: usize,
    pub sum: DurationView,
    pub mean: DurationView,
    pub median: DurationView,
    pub mode: DurationView,
    pub min: DurationView,
    pub max: DurationView,
    pub range: DurationView,
    pub std_dev: DurationView,
    pub variance_secs2: f64,
    pub percentiles: DurationPercentilesView,
}

impl From<&DurationStatistics> for DurationStatsView {
    fn from(s: &DurationStatistics) -> Self {
        let p = &s.percentiles;
        Self {
            count: s.count,
            sum: duration(s.sum),
            mean: duration(s.mean),
            median: duration(s.median),
            mode: duration(s.mode),
            min: duration(s.min),
            max: duration(s.max),
            range: duration(s.range),
            std_dev: duration(s.std_dev),
            variance_secs2: s.variance_secs2,
            percentiles: DurationPercentilesView {
                p10: duration(p.p10),
                p25: duration(p.p25),
                p50: duration(p.p50),
                p75: duration(p.p75),
                p90: duration(p.p90),
                p95: duration(p.p95),
                p99: duration(p.p99),
            },
        }
    }
}

#[derive(Serialize)]
pub struct CycleTimeStatsView {
    pub total_cycle_time: DurationStatsView,
    pub time_to_first_review: DurationStatsView,
    pub time_to_approval: DurationStatsView,
    pub time_to_merge: DurationStatsView,
}

impl From<&CycleTimeStats> for CycleTimeStatsView {
    fn from(s: &CycleTimeStats) -> Self {
        Self {
            total_cycle_time: (&s.total_cycle_time).into(),
            time_to_first_review: (&s.time_to_first_review).into(),
            time_to_approval: (&s.time_to_approval).into(),
            time_to_merge: (&s.time_to_merge).into(),
        }
    }
}

#[derive(Serialize)]
pub struct CycleTimeStatisticsView {
    pub total_prs: usize,
    #[serde(flatten)]
    pub stats: CycleTimeStatsView,
}

impl From<&CycleTimeStatistics> for CycleTimeStatisticsView {
    fn from(s: &CycleTimeStatistics) -> Self {
        Self {
            total_prs: s.total_prs,
            stats: (&s.stats).into(),
        }
    }
}

#[derive(Serialize)]
pub struct SummaryView<'a> {
    pub period: AggregationPeriod,
    pub total_prs: usize,
    pub date_range: DateRange,
    pub generated_at: DateTime<Utc>,
    pub cycle_time_stats: CycleTimeStatsView,
    pub review_stats: &'a ReviewStats,
    pub size_stats: &'a SizeStats,
    pub quality_stats: &'a QualityStats,
    pub complexity_stats: &'a ComplexityStats,
    pub productivity: &'a ProductivityMetrics,
    pub trend_analysis: &'a TrendAnalysisResult,
    pub bottlenecks: &'a [Bottleneck],
}

impl<'a> From<&'a MetricsSummary> for SummaryView<'a> {
    fn from(s: &'a MetricsSummary) -> Self {
        Self {
            period: s.period,
            total_prs: s.total_prs,
            date_range: s.date_range,
            generated_at: s.generated_at,
            cycle_time_stats: (&s.cycle_time_stats).into(),
            review_stats: &s.review_stats,
            size_stats: &s.size_stats,
            quality_stats: &s.quality_stats,
            complexity_stats: &s.complexity_stats,
            productivity: &s.productivity,
            trend_analysis: &s.trend_analysis,
            bottlenecks: &s.bottlenecks,
        }
    }
}

#[derive(Serialize)]
pub struct TeamView<'a> {
    #[serde(flatten)]
    pub summary: SummaryView<'a>,
}

impl<'a> From<&'a TeamMetrics> for TeamView<'a> {
    fn from(t: &'a TeamMetrics) -> Self {
        Self {
            summary: (&t.summary).into(),
        }
    }
}

#[derive(Serialize)]
pub struct DeveloperView<'a> {
    pub developer: &'a str,
    #[serde(flatten)]
    pub summary: SummaryView<'a>,
}

impl<'a> From<&'a DeveloperMetrics> for DeveloperView<'a> {
    fn from(d: &'a DeveloperMetrics) -> Self {
        Self {
            developer: &d.developer,
            summary: (&d.summary).into(),
        }
    }
}

#[derive(Serialize)]
pub struct RepositoryView<'a> {
    pub repository: &'a str,
    pub contributors: &'a [String],
    #[serde(flatten)]
    pub summary: SummaryView<'a>,
}

impl<'a> From<&'a RepositoryMetrics> for RepositoryView<'a> {
    fn from(r: &'a RepositoryMetrics) -> Self {
        Self {
            repository: &r.repository,
            contributors: &r.contributors,
            summary: (&r.summary).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duration_view() {
        let view = duration(Duration::minutes(150));
        assert_eq!(view.seconds, 9000.0);
        assert_eq!(view.formatted, "2.5h");
    }

    #[test]
    fn test_absent_duration_is_null() {
        let metrics = TimeMetrics {
            time_to_first_review: Some(Duration::minutes(45)),
            ..Default::default()
        };
        let value = serde_json::to_value(TimeMetricsView::from(&metrics)).unwrap();
        assert_eq!(value["total_cycle_time"], serde_json::Value::Null);
        assert_eq!(
            value["time_to_first_review"],
            json!({"seconds": 2700.0, "formatted": "45m"})
        );
    }

    #[test]
    fn test_summary_view_renders_percentiles() {
        let summary = MetricsSummary::empty(AggregationPeriod::Weekly, Utc::now());
        let team = TeamMetrics { summary };
        let value = serde_json::to_value(TeamView::from(&team)).unwrap();
        assert_eq!(value["period"], "weekly");
        assert_eq!(
            value["cycle_time_stats"]["total_cycle_time"]["percentiles"]["p99"]["seconds"],
            0.0
        );
    }
}
