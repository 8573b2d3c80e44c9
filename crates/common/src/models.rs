//! Domain models

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::option_millis;

/// A pull request as supplied by the data-fetch layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequestRecord {
    pub id: String,
    pub number: i32,
    pub title: String,
    pub author: String,
    pub repository: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub first_reviewed_at: Option<DateTime<Utc>>,
    pub last_approved_at: Option<DateTime<Utc>>,
    pub additions: i64,
    pub deletions: i64,
    pub head_branch: String,
    #[serde(default)]
    pub base_branch: String,
}

/// Kind of a review lifecycle event
///
/// Unrecognized kinds are preserved in `Unknown` and ignored by classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReviewEventKind {
    Requested,
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    ReadyForReview,
    Merged,
    Unknown(String),
}

impl ReviewEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            ReviewEventKind::Requested => "requested",
            ReviewEventKind::Approved => "approved",
            ReviewEventKind::ChangesRequested => "changes_requested",
            ReviewEventKind::Commented => "commented",
            ReviewEventKind::Dismissed => "dismissed",
            ReviewEventKind::ReadyForReview => "ready_for_review",
            ReviewEventKind::Merged => "merged",
            ReviewEventKind::Unknown(raw) => raw,
        }
    }

    /// Comment, approval or change request
    pub fn is_review_response(&self) -> bool {
        matches!(
            self,
            ReviewEventKind::Commented
                | ReviewEventKind::Approved
                | ReviewEventKind::ChangesRequested
        )
    }
}

impl From<String> for ReviewEventKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "requested" => ReviewEventKind::Requested,
            "approved" => ReviewEventKind::Approved,
            "changes_requested" => ReviewEventKind::ChangesRequested,
            "commented" => ReviewEventKind::Commented,
            "dismissed" => ReviewEventKind::Dismissed,
            "ready_for_review" => ReviewEventKind::ReadyForReview,
            "merged" => ReviewEventKind::Merged,
            _ => ReviewEventKind::Unknown(raw),
        }
    }
}

impl From<&str> for ReviewEventKind {
    fn from(raw: &str) -> Self {
        ReviewEventKind::from(raw.to_string())
    }
}

impl From<ReviewEventKind> for String {
    fn from(kind: ReviewEventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ReviewEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single review lifecycle event on a PR
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewEvent {
    pub kind: ReviewEventKind,
    pub created_at: DateTime<Utc>,
    pub actor: String,
    pub reviewer: Option<String>,
}

/// Per-file diff detail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChangeRecord {
    pub file_name: String,
    pub file_type: String,
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub is_new_file: bool,
    pub is_deleted: bool,
    pub is_renamed: bool,
}

impl FileChangeRecord {
    pub fn lines_changed(&self) -> i64 {
        self.lines_added + self.lines_deleted
    }
}

/// PR size bucket by changed lines (upper bounds inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeCategory {
    XS,
    S,
    M,
    L,
    XL,
}

impl SizeCategory {
    pub const ALL: [SizeCategory; 5] = [
        SizeCategory::XS,
        SizeCategory::S,
        SizeCategory::M,
        SizeCategory::L,
        SizeCategory::XL,
    ];

    pub fn from_lines_changed(lines: i64) -> Self {
        match lines {
            i64::MIN..=50 => SizeCategory::XS,
            51..=100 => SizeCategory::S,
            101..=300 => SizeCategory::M,
            301..=600 => SizeCategory::L,
            _ => SizeCategory::XL,
        }
    }

    pub fn is_large(&self) -> bool {
        matches!(self, SizeCategory::L | SizeCategory::XL)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeCategory::XS => "XS",
            SizeCategory::S => "S",
            SizeCategory::M => "M",
            SizeCategory::L => "L",
            SizeCategory::XL => "XL",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SizeCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown size category {s}")))
    }
}

/// Ordinal complexity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ComplexityLevel {
    pub fn from_score(score: f64) -> Self {
        if score <= 1.5 {
            ComplexityLevel::VeryLow
        } else if score <= 2.5 {
            ComplexityLevel::Low
        } else if score <= 4.0 {
            ComplexityLevel::Medium
        } else if score <= 6.0 {
            ComplexityLevel::High
        } else {
            ComplexityLevel::VeryHigh
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, ComplexityLevel::High | ComplexityLevel::VeryHigh)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SizeMetrics {
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub lines_changed: i64,
    pub files_changed: i64,
    /// File count per file type
    pub file_type_breakdown: BTreeMap<String, i64>,
    pub directory_count: i64,
    pub file_changes: Vec<FileChangeRecord>,
}

/// Lifecycle intervals. Each is `None` until its defining event occurs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeMetrics {
    #[serde(with = "option_millis")]
    pub total_cycle_time: Option<Duration>,
    #[serde(with = "option_millis")]
    pub time_to_first_review: Option<Duration>,
    #[serde(with = "option_millis")]
    pub time_to_approval: Option<Duration>,
    #[serde(with = "option_millis")]
    pub time_to_merge: Option<Duration>,
    #[serde(with = "option_millis")]
    pub review_wait_time: Option<Duration>,
    #[serde(with = "option_millis")]
    pub review_active_time: Option<Duration>,
    /// Hour of day (UTC) the PR was opened
    pub created_hour: u32,
    pub merged_hour: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityMetrics {
    pub review_comment_count: i32,
    pub review_round_count: i32,
    pub reviewer_count: i32,
    pub approvals_received: i32,
    /// Sorted, de-duplicated
    pub reviewers_involved: Vec<String>,
    pub approvers_involved: Vec<String>,
    pub first_review_pass_rate: f64,
    pub average_comment_per_file: f64,
    pub commit_count: i32,
    pub fixup_commit_count: i32,
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            review_comment_count: 0,
            review_round_count: 0,
            reviewer_count: 0,
            approvals_received: 0,
            reviewers_involved: Vec::new(),
            approvers_involved: Vec::new(),
            first_review_pass_rate: 1.0,
            average_comment_per_file: 0.0,
            commit_count: 1,
            fixup_commit_count: 0,
        }
    }
}

/// Complete derived metrics for one PR
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrMetrics {
    pub pr_id: String,
    pub pr_number: i32,
    pub title: String,
    pub author: String,
    pub repository: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub size_metrics: SizeMetrics,
    pub time_metrics: TimeMetrics,
    pub quality_metrics: QualityMetrics,
    pub complexity_score: f64,
    pub size_category: SizeCategory,
}

impl PrMetrics {
    pub fn is_large_pr(&self) -> bool {
        self.size_category.is_large()
    }

    /// 1.0 for a single round, otherwise the reciprocal of the round count
    pub fn review_efficiency(&self) -> f64 {
        let rounds = self.quality_metrics.review_round_count;
        if rounds <= 1 {
            return 1.0;
        }
        (1.0 / rounds as f64).min(1.0)
    }

    pub fn has_long_review_time(&self, threshold: Duration) -> bool {
        self.time_metrics
            .time_to_first_review
            .map(|d| d > threshold)
            .unwrap_or(false)
    }

    pub fn is_high_quality(&self) -> bool {
        let q = &self.quality_metrics;
        q.review_comment_count <= 3 && q.review_round_count <= 2 && q.first_review_pass_rate >= 0.8
    }

    /// Most frequent file type; ties go to the lexicographically smallest name
    pub fn dominant_file_type(&self) -> String {
        self.size_metrics
            .file_type_breakdown
            .iter()
            .fold(None::<(&String, i64)>, |best, (ty, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((ty, count)),
            })
            .map(|(ty, _)| ty.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn complexity_level(&self) -> ComplexityLevel {
        ComplexityLevel::from_score(self.complexity_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_metrics() -> PrMetrics {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        PrMetrics {
            pr_id: "42".to_string(),
            pr_number: 42,
            title: "Add cache".to_string(),
            author: "alice".to_string(),
            repository: "acme/widgets".to_string(),
            created_at: created,
            merged_at: Some(created + Duration::hours(24)),
            size_metrics: SizeMetrics {
                lines_added: 80,
                lines_deleted: 20,
                lines_changed: 100,
                files_changed: 2,
                file_type_breakdown: BTreeMap::from([
                    (".rs".to_string(), 1),
                    (".md".to_string(), 1),
                ]),
                directory_count: 1,
                file_changes: vec![],
            },
            time_metrics: TimeMetrics {
                total_cycle_time: Some(Duration::hours(24)),
                time_to_first_review: Some(Duration::hours(2)),
                created_hour: 10,
                merged_hour: Some(10),
                ..Default::default()
            },
            quality_metrics: QualityMetrics {
                review_comment_count: 2,
                review_round_count: 1,
                ..Default::default()
            },
            complexity_score: 2.0,
            size_category: SizeCategory::S,
        }
    }

    #[test]
    fn test_size_category_boundaries() {
        let cases = [
            (0, SizeCategory::XS),
            (50, SizeCategory::XS),
            (51, SizeCategory::S),
            (100, SizeCategory::S),
            (101, SizeCategory::M),
            (300, SizeCategory::M),
            (301, SizeCategory::L),
            (600, SizeCategory::L),
            (601, SizeCategory::XL),
        ];
        for (lines, expected) in cases {
            assert_eq!(SizeCategory::from_lines_changed(lines), expected, "{lines}");
        }
    }

    #[test]
    fn test_unknown_event_kind_roundtrip() {
        let kind: ReviewEventKind = serde_json::from_str(r#""head_ref_force_pushed""#).unwrap();
        assert_eq!(
            kind,
            ReviewEventKind::Unknown("head_ref_force_pushed".to_string())
        );
        assert!(!kind.is_review_response());
        assert_eq!(
            serde_json::to_string(&ReviewEventKind::ChangesRequested).unwrap(),
            r#""changes_requested""#
        );
    }

    #[test]
    fn test_review_efficiency() {
        let mut m = make_metrics();
        m.quality_metrics.review_comment_count = 40;
        assert_eq!(m.review_efficiency(), 1.0);
        m.quality_metrics.review_round_count = 4;
        assert_eq!(m.review_efficiency(), 0.25);
    }

    #[test]
    fn test_dominant_file_type_tie_break() {
        let mut m = make_metrics();
        assert_eq!(m.dominant_file_type(), ".md");
        m.size_metrics.file_type_breakdown.insert(".rs".to_string(), 3);
        assert_eq!(m.dominant_file_type(), ".rs");
        m.size_metrics.file_type_breakdown.clear();
        assert_eq!(m.dominant_file_type(), "unknown");
    }

    #[test]
    fn test_high_quality_and_long_review() {
        let mut m = make_metrics();
        assert!(m.is_high_quality());
        assert!(m.has_long_review_time(Duration::hours(1)));
        assert!(!m.has_long_review_time(Duration::hours(4)));
        m.quality_metrics.first_review_pass_rate = 0.5;
        assert!(!m.is_high_quality());
    }

    #[test]
    fn test_pr_metrics_roundtrip() {
        let m = make_metrics();
        let json = serde_json::to_string(&m).unwrap();
        let back: PrMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert!(json.contains(r#""time_to_approval":null"#));
    }

    #[test]
    fn test_complexity_level_thresholds() {
        assert_eq!(ComplexityLevel::from_score(1.5), ComplexityLevel::VeryLow);
        assert_eq!(ComplexityLevel::from_score(2.5), ComplexityLevel::Low);
        assert_eq!(ComplexityLevel::from_score(4.0), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(6.0), ComplexityLevel::High);
        assert_eq!(ComplexityLevel::from_score(6.1), ComplexityLevel::VeryHigh);
    }
}
