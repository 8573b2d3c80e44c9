//! Statistical summaries and team/developer/repository rollups

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::millis;
use crate::models::{ComplexityLevel, SizeCategory};

/// Fixed percentile set over floating-point values
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Percentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DurationPercentiles {
    #[serde(with = "millis")]
    pub p10: Duration,
    #[serde(with = "millis")]
    pub p25: Duration,
    #[serde(with = "millis")]
    pub p50: Duration,
    #[serde(with = "millis")]
    pub p75: Duration,
    #[serde(with = "millis")]
    pub p90: Duration,
    #[serde(with = "millis")]
    pub p95: Duration,
    #[serde(with = "millis")]
    pub p99: Duration,
}

impl Default for DurationPercentiles {
    fn default() -> Self {
        Self {
            p10: Duration::zero(),
            p25: Duration::zero(),
            p50: Duration::zero(),
            p75: Duration::zero(),
            p90: Duration::zero(),
            p95: Duration::zero(),
            p99: Duration::zero(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntStatistics {
    pub count: usize,
    pub sum: i64,
    pub mean: f64,
    pub median: f64,
    pub mode: i64,
    pub min: i64,
    pub max: i64,
    pub range: i64,
    pub variance: f64,
    pub std_dev: f64,
    pub percentiles: Percentiles,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FloatStatistics {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub skewness: f64,
    /// Excess kurtosis (normal distribution = 0)
    pub kurtosis: f64,
    pub percentiles: Percentiles,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DurationStatistics {
    pub count: usize,
    #[serde(with = "millis")]
    pub sum: Duration,
    #[serde(with = "millis")]
    pub mean: Duration,
    #[serde(with = "millis")]
    pub median: Duration,
    #[serde(with = "millis")]
    pub mode: Duration,
    #[serde(with = "millis")]
    pub min: Duration,
    #[serde(with = "millis")]
    pub max: Duration,
    #[serde(with = "millis")]
    pub range: Duration,
    /// Population variance in seconds squared
    pub variance_secs2: f64,
    #[serde(with = "millis")]
    pub std_dev: Duration,
    pub percentiles: DurationPercentiles,
}

impl Default for DurationStatistics {
    fn default() -> Self {
        Self {
            count: 0,
            sum: Duration::zero(),
            mean: Duration::zero(),
            median: Duration::zero(),
            mode: Duration::zero(),
            min: Duration::zero(),
            max: Duration::zero(),
            range: Duration::zero(),
            variance_secs2: 0.0,
            std_dev: Duration::zero(),
            percentiles: DurationPercentiles::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    #[default]
    InsufficientData,
}

/// Least-squares fit of a series against its index
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrendAnalysis {
    pub slope: f64,
    pub intercept: f64,
    pub correlation_coeff: f64,
    pub trend: TrendDirection,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    Iqr,
    ZScore,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutlierDetection {
    pub method: OutlierMethod,
    pub threshold: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub outliers: Vec<f64>,
    /// Positions of the outliers in the input sequence
    pub outlier_indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPeriod {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl AggregationPeriod {
    /// Day count for fixed periods, `None` for custom
    pub fn fixed_days(&self) -> Option<i64> {
        match self {
            AggregationPeriod::Daily => Some(1),
            AggregationPeriod::Weekly => Some(7),
            AggregationPeriod::Monthly => Some(30),
            AggregationPeriod::Custom => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPeriod::Daily => "daily",
            AggregationPeriod::Weekly => "weekly",
            AggregationPeriod::Monthly => "monthly",
            AggregationPeriod::Custom => "custom",
        }
    }
}

impl fmt::Display for AggregationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationPeriod {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(AggregationPeriod::Daily),
            "weekly" => Ok(AggregationPeriod::Weekly),
            "monthly" => Ok(AggregationPeriod::Monthly),
            "custom" => Ok(AggregationPeriod::Custom),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown aggregation period {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: DateTime::<Utc>::UNIX_EPOCH,
            end: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl DateRange {
    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CycleTimeStats {
    pub total_cycle_time: DurationStatistics,
    pub time_to_first_review: DurationStatistics,
    pub time_to_approval: DurationStatistics,
    pub time_to_merge: DurationStatistics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewStats {
    pub comment_count: IntStatistics,
    pub round_count: IntStatistics,
    pub reviewer_count: IntStatistics,
    pub first_review_pass_rate: FloatStatistics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SizeStats {
    pub lines_added: IntStatistics,
    pub lines_deleted: IntStatistics,
    pub lines_changed: IntStatistics,
    pub files_changed: IntStatistics,
    pub size_category_distribution: BTreeMap<SizeCategory, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityStats {
    pub commit_count: IntStatistics,
    pub fixup_commit_count: IntStatistics,
    pub approvals_received: IntStatistics,
    pub quality_distribution: BTreeMap<QualityTier, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComplexityStats {
    pub complexity_score: FloatStatistics,
    pub complexity_distribution: BTreeMap<ComplexityLevel, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductivityMetrics {
    pub prs_per_day: f64,
    pub lines_per_day: f64,
    pub avg_pr_size: f64,
    pub throughput: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrendAnalysisResult {
    pub cycle_time_trend: TrendAnalysis,
    pub review_time_trend: TrendAnalysis,
    pub quality_trend: TrendAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    LongCycleTime,
    MultipleReviewRounds,
    LargePr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A PR that crossed a fixed threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    pub pr_id: String,
    pub severity: Severity,
    pub description: String,
    pub value: f64,
}

/// The statistical pipeline output shared by every rollup level
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    pub period: AggregationPeriod,
    pub total_prs: usize,
    pub date_range: DateRange,
    pub generated_at: DateTime<Utc>,
    pub cycle_time_stats: CycleTimeStats,
    pub review_stats: ReviewStats,
    pub size_stats: SizeStats,
    pub quality_stats: QualityStats,
    pub complexity_stats: ComplexityStats,
    pub productivity: ProductivityMetrics,
    pub trend_analysis: TrendAnalysisResult,
    pub bottlenecks: Vec<Bottleneck>,
}

impl MetricsSummary {
    /// Zero-valued summary for an empty collection
    pub fn empty(period: AggregationPeriod, generated_at: DateTime<Utc>) -> Self {
        Self {
            period,
            total_prs: 0,
            date_range: DateRange::default(),
            generated_at,
            cycle_time_stats: CycleTimeStats::default(),
            review_stats: ReviewStats::default(),
            size_stats: SizeStats::default(),
            quality_stats: QualityStats::default(),
            complexity_stats: ComplexityStats::default(),
            productivity: ProductivityMetrics::default(),
            trend_analysis: TrendAnalysisResult::default(),
            bottlenecks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamMetrics {
    #[serde(flatten)]
    pub summary: MetricsSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeveloperMetrics {
    pub developer: String,
    #[serde(flatten)]
    pub summary: MetricsSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryMetrics {
    pub repository: String,
    /// Sorted, de-duplicated authors
    pub contributors: Vec<String>,
    #[serde(flatten)]
    pub summary: MetricsSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_parse() {
        assert_eq!(
            "monthly".parse::<AggregationPeriod>().unwrap(),
            AggregationPeriod::Monthly
        );
        assert!("yearly".parse::<AggregationPeriod>().is_err());
        assert_eq!(AggregationPeriod::Custom.fixed_days(), None);
        assert_eq!(AggregationPeriod::Weekly.fixed_days(), Some(7));
    }

    #[test]
    fn test_team_metrics_roundtrip() {
        let generated = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let mut summary = MetricsSummary::empty(AggregationPeriod::Weekly, generated);
        summary.total_prs = 3;
        summary
            .size_stats
            .size_category_distribution
            .insert(SizeCategory::XL, 1);
        summary
            .complexity_stats
            .complexity_distribution
            .insert(ComplexityLevel::VeryHigh, 1);
        summary.bottlenecks.push(Bottleneck {
            kind: BottleneckKind::LargePr,
            pr_id: "7".to_string(),
            severity: Severity::Medium,
            description: "Large PR".to_string(),
            value: 900.0,
        });
        summary.cycle_time_stats.total_cycle_time.median = Duration::hours(24);
        let team = TeamMetrics { summary };

        let json = serde_json::to_string(&team).unwrap();
        assert!(json.contains(r#""kind":"large_pr""#));
        assert!(json.contains(r#""very_high":1"#));
        let back: TeamMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, team);
    }

    #[test]
    fn test_repository_metrics_flattened_fields() {
        let generated = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let repo = RepositoryMetrics {
            repository: "acme/widgets".to_string(),
            contributors: vec!["alice".to_string(), "bob".to_string()],
            summary: MetricsSummary::empty(AggregationPeriod::Daily, generated),
        };
        let value = serde_json::to_value(&repo).unwrap();
        assert_eq!(value["repository"], "acme/widgets");
        assert_eq!(value["total_prs"], 0);
        assert_eq!(value["period"], "daily");
    }
}
