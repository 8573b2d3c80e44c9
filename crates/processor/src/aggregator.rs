//! Team, developer and repository rollups over per-PR metrics

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, Utc};
use common::duration::{as_hours_f64, format_duration};
use common::models::{ComplexityLevel, PrMetrics, TimeMetrics};
use common::rollups::{
    AggregationPeriod, Bottleneck, BottleneckKind, ComplexityStats, CycleTimeStats, DateRange,
    DeveloperMetrics, MetricsSummary, ProductivityMetrics, QualityStats, QualityTier,
    RepositoryMetrics, ReviewStats, Severity, SizeStats, TeamMetrics, TrendAnalysisResult,
};
use tracing::debug;

use crate::cycle_time::CycleTimeCalculator;
use crate::stats;

/// Comment count above which a PR falls in the low quality tier
const LOW_QUALITY_COMMENTS: i32 = 10;

/// Fixed thresholds for rollup bottleneck detection
#[derive(Debug, Clone)]
pub struct BottleneckThresholds {
    pub long_cycle_time: Duration,
    pub max_review_rounds: i32,
}

impl Default for BottleneckThresholds {
    fn default() -> Self {
        Self {
            long_cycle_time: Duration::days(7),
            max_review_rounds: 5,
        }
    }
}

#[derive(Default)]
pub struct MetricsAggregator {
    thresholds: BottleneckThresholds,
}

impl MetricsAggregator {
    pub fn new(thresholds: BottleneckThresholds) -> Self {
        Self { thresholds }
    }

    pub fn aggregate_team(&self, metrics: &[PrMetrics], period: AggregationPeriod) -> TeamMetrics {
        let all: Vec<&PrMetrics> = metrics.iter().collect();
        TeamMetrics {
            summary: self.summarize(&all, period),
        }
    }

    /// One rollup per author
    pub fn aggregate_developers(
        &self,
        metrics: &[PrMetrics],
        period: AggregationPeriod,
    ) -> BTreeMap<String, DeveloperMetrics> {
        group_by(metrics, |m| m.author.as_str())
            .into_iter()
            .map(|(developer, group)| {
                let summary = self.summarize(&group, period);
                let developer = developer.to_string();
                (developer.clone(), DeveloperMetrics { developer, summary })
            })
            .collect()
    }

    /// One rollup per repository, with its contributor list
    pub fn aggregate_repositories(
        &self,
        metrics: &[PrMetrics],
        period: AggregationPeriod,
    ) -> BTreeMap<String, RepositoryMetrics> {
        group_by(metrics, |m| m.repository.as_str())
            .into_iter()
            .map(|(repository, group)| {
                let contributors: BTreeSet<&str> = group.iter().map(|m| m.author.as_str()).collect();
                let summary = self.summarize(&group, period);
                let repository = repository.to_string();
                (
                    repository.clone(),
                    RepositoryMetrics {
                        repository,
                        contributors: contributors.into_iter().map(str::to_string).collect(),
                        summary,
                    },
                )
            })
            .collect()
    }

    /// The statistical pipeline shared by every rollup level
    pub fn summarize(&self, metrics: &[&PrMetrics], period: AggregationPeriod) -> MetricsSummary {
        let generated_at = Utc::now();
        if metrics.is_empty() {
            return MetricsSummary::empty(period, generated_at);
        }
        debug!("Summarizing {} PRs for {} period", metrics.len(), period);

        let date_range = date_range(metrics);
        MetricsSummary {
            period,
            total_prs: metrics.len(),
            date_range,
            generated_at,
            cycle_time_stats: cycle_time_stats(metrics),
            review_stats: review_stats(metrics),
            size_stats: size_stats(metrics),
            quality_stats: quality_stats(metrics),
            complexity_stats: complexity_stats(metrics),
            productivity: productivity(metrics, period, &date_range),
            trend_analysis: trends(metrics),
            bottlenecks: self.bottlenecks(metrics),
        }
    }

    /// Long cycle times first, then review rounds, then large PRs
    pub fn bottlenecks(&self, metrics: &[&PrMetrics]) -> Vec<Bottleneck> {
        let long_cycle = metrics.iter().filter_map(|m| {
            let cycle = m.time_metrics.total_cycle_time?;
            (cycle > self.thresholds.long_cycle_time).then(|| Bottleneck {
                kind: BottleneckKind::LongCycleTime,
                pr_id: m.pr_id.clone(),
                severity: Severity::High,
                description: format!("Cycle time of {}", format_duration(cycle)),
                value: as_hours_f64(cycle),
            })
        });

        let rounds = metrics.iter().filter_map(|m| {
            let rounds = m.quality_metrics.review_round_count;
            (rounds > self.thresholds.max_review_rounds).then(|| Bottleneck {
                kind: BottleneckKind::MultipleReviewRounds,
                pr_id: m.pr_id.clone(),
                severity: Severity::Medium,
                description: format!("{rounds} review rounds"),
                value: rounds as f64,
            })
        });

        let large = metrics.iter().filter(|m| m.is_large_pr()).map(|m| Bottleneck {
            kind: BottleneckKind::LargePr,
            pr_id: m.pr_id.clone(),
            severity: Severity::Medium,
            description: format!("Large PR ({} lines changed)", m.size_metrics.lines_changed),
            value: m.size_metrics.lines_changed as f64,
        });

        long_cycle.chain(rounds).chain(large).collect()
    }
}

fn group_by<'a>(
    metrics: &'a [PrMetrics],
    key: impl Fn(&'a PrMetrics) -> &'a str,
) -> BTreeMap<&'a str, Vec<&'a PrMetrics>> {
    metrics.iter().fold(BTreeMap::new(), |mut groups, m| {
        groups.entry(key(m)).or_insert_with(Vec::new).push(m);
        groups
    })
}

/// Earliest creation to latest of creation or merge
fn date_range(metrics: &[&PrMetrics]) -> DateRange {
    let start = metrics.iter().map(|m| m.created_at).min();
    let end = metrics
        .iter()
        .map(|m| m.merged_at.map_or(m.created_at, |merged| merged.max(m.created_at)))
        .max();
    match (start, end) {
        (Some(start), Some(end)) => DateRange { start, end },
        _ => DateRange::default(),
    }
}

fn ints(metrics: &[&PrMetrics], pick: fn(&PrMetrics) -> i64) -> Vec<i64> {
    metrics.iter().map(|m| pick(m)).collect()
}

fn cycle_time_stats(metrics: &[&PrMetrics]) -> CycleTimeStats {
    CycleTimeCalculator::default()
        .calculate_statistics(metrics.iter().copied())
        .stats
}

fn review_stats(metrics: &[&PrMetrics]) -> ReviewStats {
    let pass_rates: Vec<f64> = metrics
        .iter()
        .map(|m| m.quality_metrics.first_review_pass_rate)
        .collect();
    ReviewStats {
        comment_count: stats::int_stats(&ints(metrics, |m| {
            m.quality_metrics.review_comment_count as i64
        })),
        round_count: stats::int_stats(&ints(metrics, |m| {
            m.quality_metrics.review_round_count as i64
        })),
        reviewer_count: stats::int_stats(&ints(metrics, |m| m.quality_metrics.reviewer_count as i64)),
        first_review_pass_rate: stats::float_stats(&pass_rates),
    }
}

fn size_stats(metrics: &[&PrMetrics]) -> SizeStats {
    SizeStats {
        lines_added: stats::int_stats(&ints(metrics, |m| m.size_metrics.lines_added)),
        lines_deleted: stats::int_stats(&ints(metrics, |m| m.size_metrics.lines_deleted)),
        lines_changed: stats::int_stats(&ints(metrics, |m| m.size_metrics.lines_changed)),
        files_changed: stats::int_stats(&ints(metrics, |m| m.size_metrics.files_changed)),
        size_category_distribution: histogram(metrics.iter().map(|m| m.size_category)),
    }
}

fn quality_stats(metrics: &[&PrMetrics]) -> QualityStats {
    QualityStats {
        commit_count: stats::int_stats(&ints(metrics, |m| m.quality_metrics.commit_count as i64)),
        fixup_commit_count: stats::int_stats(&ints(metrics, |m| {
            m.quality_metrics.fixup_commit_count as i64
        })),
        approvals_received: stats::int_stats(&ints(metrics, |m| {
            m.quality_metrics.approvals_received as i64
        })),
        quality_distribution: histogram(metrics.iter().map(|m| quality_tier(m))),
    }
}

fn complexity_stats(metrics: &[&PrMetrics]) -> ComplexityStats {
    let scores: Vec<f64> = metrics.iter().map(|m| m.complexity_score).collect();
    ComplexityStats {
        complexity_score: stats::float_stats(&scores),
        complexity_distribution: histogram(
            scores.iter().map(|&s| ComplexityLevel::from_score(s)),
        ),
    }
}

pub fn quality_tier(metrics: &PrMetrics) -> QualityTier {
    if metrics.is_high_quality() {
        QualityTier::High
    } else if metrics.quality_metrics.review_comment_count > LOW_QUALITY_COMMENTS {
        QualityTier::Low
    } else {
        QualityTier::Medium
    }
}

fn histogram<K: Ord>(keys: impl Iterator<Item = K>) -> BTreeMap<K, usize> {
    keys.fold(BTreeMap::new(), |mut acc, k| {
        *acc.entry(k).or_insert(0) += 1;
        acc
    })
}

fn productivity(
    metrics: &[&PrMetrics],
    period: AggregationPeriod,
    range: &DateRange,
) -> ProductivityMetrics {
    let days = period
        .fixed_days()
        .map(|d| d as f64)
        .unwrap_or_else(|| as_hours_f64(range.span()) / 24.0)
        .max(1.0);
    let total_lines: i64 = metrics.iter().map(|m| m.size_metrics.lines_changed).sum();
    let count = metrics.len();

    ProductivityMetrics {
        prs_per_day: count as f64 / days,
        lines_per_day: total_lines as f64 / days,
        avg_pr_size: total_lines as f64 / count as f64,
        throughput: count,
    }
}

/// `first_review_pass_rate - comments / 10`, floored at zero
pub fn quality_score(metrics: &PrMetrics) -> f64 {
    let q = &metrics.quality_metrics;
    (q.first_review_pass_rate - q.review_comment_count as f64 / 10.0).max(0.0)
}

/// Daily averages in chronological order, fed through trend regression.
/// Days without a sample for a signal are left out of that signal's series.
fn trends(metrics: &[&PrMetrics]) -> TrendAnalysisResult {
    let by_day: BTreeMap<NaiveDate, Vec<&PrMetrics>> =
        metrics.iter().fold(BTreeMap::new(), |mut acc, m| {
            acc.entry(m.created_at.date_naive())
                .or_insert_with(Vec::new)
                .push(*m);
            acc
        });

    let cycle: Vec<f64> = by_day
        .values()
        .filter_map(|day| mean_hours(day, |t| t.total_cycle_time))
        .collect();
    let review: Vec<f64> = by_day
        .values()
        .filter_map(|day| mean_hours(day, |t| t.time_to_first_review))
        .collect();
    let quality: Vec<f64> = by_day
        .values()
        .map(|day| day.iter().map(|m| quality_score(m)).sum::<f64>() / day.len() as f64)
        .collect();

    TrendAnalysisResult {
        cycle_time_trend: stats::analyze_trend(&cycle),
        review_time_trend: stats::analyze_trend(&review),
        quality_trend: stats::analyze_trend(&quality),
    }
}

/// Mean of one duration signal over a day, in hours
fn mean_hours(day: &[&PrMetrics], pick: fn(&TimeMetrics) -> Option<Duration>) -> Option<f64> {
    let hours: Vec<f64> = day
        .iter()
        .filter_map(|m| pick(&m.time_metrics))
        .map(as_hours_f64)
        .collect();
    (!hours.is_empty()).then(|| hours.iter().sum::<f64>() / hours.len() as f64)
}
