//! Per-PR analysis pipeline
//!
//! Combines size derivation with the cycle-time, quality and complexity
//! analyzers into one [`PrMetrics`] record, and turns a record into
//! human-facing insights.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use common::duration::format_duration;
use common::models::{
    ComplexityLevel, FileChangeRecord, PrMetrics, PullRequestRecord, QualityMetrics, ReviewEvent,
    SizeCategory, SizeMetrics,
};
use common::rollups::Severity;
use serde::{Deserialize, Serialize};

use crate::complexity::{ComplexityAnalyzer, ComplexityConfig, SplitSuggestion};
use crate::cycle_time::{CycleTimeCalculator, CycleTimeConfig};
use crate::quality::{QualityAnalyzer, QualityConfig};

/// First review slower than this is reported as a time issue
const SLOW_FIRST_REVIEW_HOURS: i64 = 24;
/// First review slower than this triggers a review-process recommendation
const REVIEW_PROCESS_HOURS: i64 = 4;
const MAX_ROUNDS_BEFORE_ISSUE: i32 = 3;

/// Settings for every analyzer in the pipeline
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub cycle_time: CycleTimeConfig,
    pub quality: QualityConfig,
    pub complexity: ComplexityConfig,
}

impl From<&common::Config> for AnalysisConfig {
    fn from(config: &common::Config) -> Self {
        Self {
            cycle_time: CycleTimeConfig::from(config),
            quality: QualityConfig::from(config),
            complexity: ComplexityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    TooLarge,
    SlowReview,
    MultipleRounds,
    HighComplexity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SplitPr,
    ImproveReviewProcess,
    ImproveCodeQuality,
    SimplifyChanges,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedAction {
    pub kind: ActionKind,
    pub priority: Severity,
    pub description: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrInsights {
    pub pr_id: String,
    pub size_issues: Vec<Issue>,
    pub time_issues: Vec<Issue>,
    pub quality_issues: Vec<Issue>,
    pub complexity_issues: Vec<Issue>,
    pub split_suggestions: Vec<SplitSuggestion>,
    pub recommended_actions: Vec<RecommendedAction>,
}

pub struct PrAnalysisService {
    cycle_time: CycleTimeCalculator,
    quality: QualityAnalyzer,
    complexity: ComplexityAnalyzer,
}

impl Default for PrAnalysisService {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl PrAnalysisService {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            cycle_time: CycleTimeCalculator::new(config.cycle_time),
            quality: QualityAnalyzer::new(config.quality),
            complexity: ComplexityAnalyzer::new(config.complexity),
        }
    }

    pub fn cycle_time(&self) -> &CycleTimeCalculator {
        &self.cycle_time
    }

    pub fn quality(&self) -> &QualityAnalyzer {
        &self.quality
    }

    pub fn complexity(&self) -> &ComplexityAnalyzer {
        &self.complexity
    }

    /// Full analysis from review history and optional file detail
    pub fn analyze(
        &self,
        pr: &PullRequestRecord,
        events: &[ReviewEvent],
        files: &[FileChangeRecord],
    ) -> PrMetrics {
        let size_metrics = size_metrics(pr, files);
        let time_metrics = self.cycle_time.calculate_time_metrics(pr, events);
        let known_files = (!files.is_empty()).then_some(size_metrics.files_changed);
        let quality_metrics = self.quality.calculate_quality_metrics(pr, events, known_files);

        self.assemble(pr, size_metrics, time_metrics, quality_metrics)
    }

    /// Analysis from PR-level fields only, with fixed estimates for review detail
    pub fn analyze_basic(&self, pr: &PullRequestRecord) -> PrMetrics {
        let size_metrics = SizeMetrics {
            files_changed: 1,
            ..size_metrics(pr, &[])
        };
        let time_metrics = self.cycle_time.calculate_time_metrics(pr, &[]);
        let quality_metrics = QualityMetrics {
            review_comment_count: 0,
            review_round_count: 1,
            reviewer_count: 1,
            approvals_received: 1,
            reviewers_involved: Vec::new(),
            approvers_involved: Vec::new(),
            first_review_pass_rate: 1.0,
            average_comment_per_file: 0.0,
            commit_count: 1,
            fixup_commit_count: 0,
        };

        self.assemble(pr, size_metrics, time_metrics, quality_metrics)
    }

    pub fn analyze_batch<'a, I>(&self, prs: I) -> Vec<PrMetrics>
    where
        I: IntoIterator<Item = &'a PullRequestRecord>,
    {
        prs.into_iter().map(|pr| self.analyze_basic(pr)).collect()
    }

    fn assemble(
        &self,
        pr: &PullRequestRecord,
        size_metrics: SizeMetrics,
        time_metrics: common::models::TimeMetrics,
        quality_metrics: QualityMetrics,
    ) -> PrMetrics {
        let complexity_score = self.complexity.score(&size_metrics, &quality_metrics);
        let size_category = SizeCategory::from_lines_changed(size_metrics.lines_changed);

        PrMetrics {
            pr_id: pr.id.clone(),
            pr_number: pr.number,
            title: pr.title.clone(),
            author: pr.author.clone(),
            repository: pr.repository.clone(),
            created_at: pr.created_at,
            merged_at: pr.merged_at,
            size_metrics,
            time_metrics,
            quality_metrics,
            complexity_score,
            size_category,
        }
    }

    /// Issues and recommended actions for one analyzed PR
    pub fn generate_insights(&self, metrics: &PrMetrics) -> PrInsights {
        let mut insights = PrInsights {
            pr_id: metrics.pr_id.clone(),
            size_issues: Vec::new(),
            time_issues: Vec::new(),
            quality_issues: Vec::new(),
            complexity_issues: Vec::new(),
            split_suggestions: Vec::new(),
            recommended_actions: Vec::new(),
        };

        if metrics.is_large_pr() {
            let severity = if metrics.size_category == SizeCategory::XL {
                Severity::High
            } else {
                Severity::Medium
            };
            insights.size_issues.push(Issue {
                kind: IssueKind::TooLarge,
                severity,
                description: format!(
                    "PR changes {} lines, which makes review difficult",
                    metrics.size_metrics.lines_changed
                ),
                suggestion: "Split the PR along feature boundaries".to_string(),
            });
            insights.split_suggestions = self.complexity.suggest_optimal_split(metrics);
        }

        if let Some(wait) = metrics.time_metrics.time_to_first_review {
            if wait > Duration::hours(SLOW_FIRST_REVIEW_HOURS) {
                insights.time_issues.push(Issue {
                    kind: IssueKind::SlowReview,
                    severity: Severity::Medium,
                    description: format!("First review took {}", format_duration(wait)),
                    suggestion: "Revisit reviewer assignment and when review is requested"
                        .to_string(),
                });
            }
        }

        let rounds = metrics.quality_metrics.review_round_count;
        if rounds > MAX_ROUNDS_BEFORE_ISSUE {
            insights.quality_issues.push(Issue {
                kind: IssueKind::MultipleRounds,
                severity: Severity::Medium,
                description: format!("Review went through {rounds} rounds"),
                suggestion: "Self-review and tighten code quality before requesting review"
                    .to_string(),
            });
        }

        let level = metrics.complexity_level();
        if level.is_high() {
            let severity = if level == ComplexityLevel::VeryHigh {
                Severity::High
            } else {
                Severity::Medium
            };
            insights.complexity_issues.push(Issue {
                kind: IssueKind::HighComplexity,
                severity,
                description: format!("Complexity score is {:.2}", metrics.complexity_score),
                suggestion: "Break the change into smaller, simpler steps".to_string(),
            });
        }

        insights.recommended_actions = recommended_actions(metrics);
        insights
    }
}

fn recommended_actions(metrics: &PrMetrics) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();

    if metrics.is_large_pr() {
        actions.push(RecommendedAction {
            kind: ActionKind::SplitPr,
            priority: Severity::High,
            description: "Split the PR into smaller reviewable pieces".to_string(),
            reason: "Large PRs are hard to review and hide defects".to_string(),
        });
    }
    if metrics.has_long_review_time(Duration::hours(REVIEW_PROCESS_HOURS)) {
        actions.push(RecommendedAction {
            kind: ActionKind::ImproveReviewProcess,
            priority: Severity::Medium,
            description: "Add reviewers or raise review priority".to_string(),
            reason: "Review latency is slowing delivery".to_string(),
        });
    }
    if !metrics.is_high_quality() {
        actions.push(RecommendedAction {
            kind: ActionKind::ImproveCodeQuality,
            priority: Severity::Medium,
            description: "Run checks and add tests before review".to_string(),
            reason: "Many review comments or change requests".to_string(),
        });
    }
    if metrics.complexity_level().is_high() {
        actions.push(RecommendedAction {
            kind: ActionKind::SimplifyChanges,
            priority: Severity::High,
            description: "Simplify the change and land it incrementally".to_string(),
            reason: "Complex changes are hard to review safely".to_string(),
        });
    }

    actions
}

/// Size metrics from diff totals plus optional per-file detail
fn size_metrics(pr: &PullRequestRecord, files: &[FileChangeRecord]) -> SizeMetrics {
    let mut size = SizeMetrics {
        lines_added: pr.additions,
        lines_deleted: pr.deletions,
        lines_changed: pr.additions + pr.deletions,
        files_changed: files.len() as i64,
        file_type_breakdown: BTreeMap::from([("unknown".to_string(), 1)]),
        directory_count: 1,
        file_changes: Vec::new(),
    };
    if files.is_empty() {
        return size;
    }

    size.file_type_breakdown = files.iter().fold(BTreeMap::new(), |mut acc, f| {
        *acc.entry(f.file_type.clone()).or_insert(0) += 1;
        acc
    });
    let directories: BTreeSet<&str> = files
        .iter()
        .flat_map(|f| ancestor_dirs(&f.file_name))
        .collect();
    size.directory_count = directories.len() as i64;
    size.file_changes = files.to_vec();
    size
}

/// Every ancestor directory of a path: `a/b/c.rs` -> `a`, `a/b`
fn ancestor_dirs(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/')
        .map(move |(i, _)| &path[..i])
        .filter(|dir| !dir.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use common::models::ReviewEventKind;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap()
    }

    fn make_pr(additions: i64, deletions: i64) -> PullRequestRecord {
        PullRequestRecord {
            id: "pr-1".to_string(),
            number: 1,
            title: "Test PR".to_string(),
            author: "alice".to_string(),
            repository: "acme/widgets".to_string(),
            created_at: t0(),
            merged_at: Some(t0() + Duration::hours(24)),
            first_reviewed_at: None,
            last_approved_at: Some(t0() + Duration::hours(20)),
            additions,
            deletions,
            head_branch: "feature".to_string(),
            base_branch: "main".to_string(),
        }
    }

    fn make_file(name: &str, ty: &str, added: i64) -> FileChangeRecord {
        FileChangeRecord {
            file_name: name.to_string(),
            file_type: ty.to_string(),
            lines_added: added,
            lines_deleted: 0,
            is_new_file: false,
            is_deleted: false,
            is_renamed: false,
        }
    }

    #[test]
    fn test_analyze_with_files() {
        let service = PrAnalysisService::default();
        let pr = make_pr(300, 20);
        let files = vec![
            make_file("src/api/handler.rs", ".rs", 200),
            make_file("src/api/routes.rs", ".rs", 100),
            make_file("docs/guide.md", ".md", 20),
        ];
        let events = vec![ReviewEvent {
            kind: ReviewEventKind::Approved,
            created_at: t0() + Duration::hours(3),
            actor: "bob".to_string(),
            reviewer: None,
        }];

        let m = service.analyze(&pr, &events, &files);
        assert_eq!(m.size_metrics.lines_changed, 320);
        assert_eq!(m.size_metrics.files_changed, 3);
        assert_eq!(m.size_metrics.directory_count, 3);
        assert_eq!(m.size_metrics.file_type_breakdown.get(".rs"), Some(&2));
        assert_eq!(m.size_category, SizeCategory::L);
        assert_eq!(m.time_metrics.time_to_first_review, Some(Duration::hours(3)));
        assert_eq!(m.quality_metrics.approvers_involved, vec!["bob"]);
        assert!(m.complexity_score >= 0.1 && m.complexity_score <= 10.0);
        assert_eq!(m.dominant_file_type(), ".rs");
    }

    #[test]
    fn test_analyze_without_files_falls_back() {
        let m = PrAnalysisService::default().analyze(&make_pr(10, 10), &[], &[]);
        assert_eq!(m.size_metrics.files_changed, 0);
        assert_eq!(m.size_metrics.directory_count, 1);
        assert_eq!(
            m.size_metrics.file_type_breakdown,
            BTreeMap::from([("unknown".to_string(), 1)])
        );
        assert_eq!(m.size_category, SizeCategory::XS);
    }

    #[test]
    fn test_basic_analysis_estimates() {
        let service = PrAnalysisService::default();
        let m = service.analyze_basic(&make_pr(40, 20));
        assert_eq!(m.size_metrics.files_changed, 1);
        assert_eq!(m.quality_metrics.commit_count, 1);
        assert_eq!(m.quality_metrics.reviewer_count, 1);
        assert_eq!(m.quality_metrics.first_review_pass_rate, 1.0);
        assert_eq!(m.time_metrics.total_cycle_time, Some(Duration::hours(24)));
        assert_eq!(m.time_metrics.time_to_approval, Some(Duration::hours(20)));
        assert_eq!(m.time_metrics.time_to_merge, Some(Duration::hours(4)));
        assert_eq!(m.time_metrics.review_wait_time, None);
        assert_eq!(m.size_category, SizeCategory::S);

        let batch = service.analyze_batch(&[make_pr(1, 1), make_pr(500, 500)]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].size_category, SizeCategory::XL);
    }

    #[test]
    fn test_ancestor_dirs() {
        let dirs: Vec<&str> = ancestor_dirs("src/components/Button.tsx").collect();
        assert_eq!(dirs, vec!["src", "src/components"]);
        assert_eq!(ancestor_dirs("README.md").count(), 0);
    }

    #[test]
    fn test_insights_for_large_slow_pr() {
        let service = PrAnalysisService::default();
        let mut pr = make_pr(700, 0);
        pr.first_reviewed_at = Some(t0() + Duration::hours(30));
        let files = vec![
            make_file("api/a.rs", ".rs", 400),
            make_file("web/b.ts", ".ts", 300),
        ];
        let m = service.analyze(&pr, &[], &files);
        let insights = service.generate_insights(&m);

        assert_eq!(insights.size_issues.len(), 1);
        assert_eq!(insights.size_issues[0].severity, Severity::High);
        assert_eq!(insights.time_issues.len(), 1);
        assert_eq!(insights.split_suggestions.len(), 2);
        let kinds: Vec<ActionKind> = insights.recommended_actions.iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&ActionKind::SplitPr));
        assert!(kinds.contains(&ActionKind::ImproveReviewProcess));
    }

    #[test]
    fn test_insights_for_clean_pr() {
        let service = PrAnalysisService::default();
        let m = service.analyze_basic(&make_pr(10, 5));
        let insights = service.generate_insights(&m);
        assert!(insights.size_issues.is_empty());
        assert!(insights.time_issues.is_empty());
        assert!(insights.quality_issues.is_empty());
        assert!(insights.complexity_issues.is_empty());
        assert!(insights.recommended_actions.is_empty());
    }
}
