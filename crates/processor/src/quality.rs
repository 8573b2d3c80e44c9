//! Review quality metrics and review bottleneck detection

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use common::duration::format_duration;
use common::models::{PrMetrics, PullRequestRecord, QualityMetrics, ReviewEvent, ReviewEventKind};
use common::rollups::{IntStatistics, Severity};
use serde::{Deserialize, Serialize};

use crate::cycle_time::chronological;
use crate::stats;

/// Lines assumed per file when no file detail is known
const LINES_PER_FILE_ESTIMATE: i64 = 50;
const SLOW_FIRST_REVIEW_HOURS: i64 = 24;
const VERY_SLOW_FIRST_REVIEW_HOURS: i64 = 72;
const MAX_ROUNDS_BEFORE_FLAG: i32 = 3;

#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Change requests closer together than this belong to the same round
    pub min_round_gap: Duration,
    /// Comment count at or below which a PR reads as clean
    pub high_quality_comment_threshold: i32,
    /// Comment count above which a PR is flagged
    pub comment_threshold: i32,
    pub good_first_pass_rate: f64,
    /// Reviewers with fewer reviewed PRs are left out of per-reviewer stats
    pub min_reviews_for_analysis: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_round_gap: Duration::hours(2),
            high_quality_comment_threshold: 3,
            comment_threshold: 10,
            good_first_pass_rate: 0.8,
            min_reviews_for_analysis: 3,
        }
    }
}

impl From<&common::Config> for QualityConfig {
    fn from(config: &common::Config) -> Self {
        Self {
            min_round_gap: Duration::minutes(config.review_round_gap_minutes),
            comment_threshold: config.review_comment_threshold,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewBottleneckKind {
    SlowReview,
    MultipleRounds,
    ManyComments,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewBottleneck {
    pub kind: ReviewBottleneckKind,
    pub pr_id: String,
    pub severity: Severity,
    pub description: String,
    pub impact: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverallReviewStats {
    pub comment_stats: IntStatistics,
    pub round_stats: IntStatistics,
    pub average_first_pass_rate: f64,
    pub median_first_pass_rate: f64,
    /// Share of PRs at or below the clean comment threshold
    pub clean_pr_ratio: f64,
    pub meets_first_pass_target: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewerStatistics {
    pub reviewer: String,
    pub total_reviews: usize,
    pub total_comments: i64,
    pub total_approvals: usize,
    pub average_comments_per_review: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewEfficiencyAnalysis {
    pub total_prs: usize,
    pub overall_stats: OverallReviewStats,
    pub reviewer_stats: Vec<ReviewerStatistics>,
}

pub struct QualityAnalyzer {
    config: QualityConfig,
}

impl Default for QualityAnalyzer {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

impl QualityAnalyzer {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Quality metrics from a PR's review history.
    ///
    /// `files_changed` is used for comment density when known; otherwise the
    /// file count is estimated from the diff size.
    pub fn calculate_quality_metrics(
        &self,
        pr: &PullRequestRecord,
        events: &[ReviewEvent],
        files_changed: Option<i64>,
    ) -> QualityMetrics {
        let events = chronological(events);

        let review_comment_count = count_comments(&events);
        let (reviewers, approvers) = participants(&events);
        let files = files_changed
            .filter(|&n| n > 0)
            .unwrap_or_else(|| ((pr.additions + pr.deletions) / LINES_PER_FILE_ESTIMATE).max(1));

        QualityMetrics {
            review_comment_count,
            review_round_count: self.review_rounds(&events),
            reviewer_count: reviewers.len() as i32,
            approvals_received: approvers.len() as i32,
            reviewers_involved: reviewers.into_iter().collect(),
            approvers_involved: approvers.into_iter().collect(),
            first_review_pass_rate: first_review_pass_rate(&events),
            average_comment_per_file: review_comment_count as f64 / files as f64,
            commit_count: 1,
            fixup_commit_count: events
                .iter()
                .filter(|e| e.kind == ReviewEventKind::ChangesRequested)
                .count() as i32,
        }
    }

    /// Change requests at least `min_round_gap` apart open a new round
    fn review_rounds(&self, events: &[&ReviewEvent]) -> i32 {
        let (rounds, _) = events
            .iter()
            .filter(|e| e.kind == ReviewEventKind::ChangesRequested)
            .fold((0, None::<DateTime<Utc>>), |(rounds, last), e| match last {
                Some(prev) if e.created_at - prev < self.config.min_round_gap => (rounds, last),
                _ => (rounds + 1, Some(e.created_at)),
            });

        if rounds == 0 && !events.is_empty() {
            1
        } else {
            rounds
        }
    }

    /// Flag slow first reviews, long round trips and noisy reviews
    pub fn analyze_review_bottlenecks<'a, I>(&self, metrics: I) -> Vec<ReviewBottleneck>
    where
        I: IntoIterator<Item = &'a PrMetrics>,
    {
        let mut bottlenecks = Vec::new();

        for m in metrics {
            if let Some(wait) = m.time_metrics.time_to_first_review {
                if wait > Duration::hours(SLOW_FIRST_REVIEW_HOURS) {
                    let severity = if wait > Duration::hours(VERY_SLOW_FIRST_REVIEW_HOURS) {
                        Severity::High
                    } else {
                        Severity::Medium
                    };
                    bottlenecks.push(ReviewBottleneck {
                        kind: ReviewBottleneckKind::SlowReview,
                        pr_id: m.pr_id.clone(),
                        severity,
                        description: format!("First review after {}", format_duration(wait)),
                        impact: "Slows delivery".to_string(),
                        suggestion: "Assign reviewers early and prioritise pending reviews"
                            .to_string(),
                    });
                }
            }

            let rounds = m.quality_metrics.review_round_count;
            if rounds > MAX_ROUNDS_BEFORE_FLAG {
                bottlenecks.push(ReviewBottleneck {
                    kind: ReviewBottleneckKind::MultipleRounds,
                    pr_id: m.pr_id.clone(),
                    severity: Severity::Medium,
                    description: format!("{rounds} review rounds"),
                    impact: "Consumes reviewer and author time".to_string(),
                    suggestion: "Self-review before requesting review".to_string(),
                });
            }

            let comments = m.quality_metrics.review_comment_count;
            if comments > self.config.comment_threshold {
                bottlenecks.push(ReviewBottleneck {
                    kind: ReviewBottleneckKind::ManyComments,
                    pr_id: m.pr_id.clone(),
                    severity: Severity::Medium,
                    description: format!("{comments} review comments"),
                    impact: "Prolongs review and feedback cycles".to_string(),
                    suggestion: "Reduce PR size and run checks before review".to_string(),
                });
            }
        }

        bottlenecks
    }

    /// Overall comment/round distribution plus per-reviewer workload
    pub fn analyze_review_efficiency<'a, I>(&self, metrics: I) -> ReviewEfficiencyAnalysis
    where
        I: IntoIterator<Item = &'a PrMetrics>,
    {
        let metrics: Vec<&PrMetrics> = metrics.into_iter().collect();
        if metrics.is_empty() {
            return ReviewEfficiencyAnalysis::default();
        }

        let comments: Vec<i64> = metrics
            .iter()
            .map(|m| m.quality_metrics.review_comment_count as i64)
            .collect();
        let rounds: Vec<i64> = metrics
            .iter()
            .map(|m| m.quality_metrics.review_round_count as i64)
            .collect();
        let mut pass_rates: Vec<f64> = metrics
            .iter()
            .map(|m| m.quality_metrics.first_review_pass_rate)
            .collect();
        pass_rates.sort_by(f64::total_cmp);
        let average_first_pass_rate = pass_rates.iter().sum::<f64>() / pass_rates.len() as f64;
        let clean = comments
            .iter()
            .filter(|&&c| c <= self.config.high_quality_comment_threshold as i64)
            .count();

        let per_reviewer = metrics.iter().fold(
            BTreeMap::<&str, ReviewerStatistics>::new(),
            |mut acc, m| {
                let q = &m.quality_metrics;
                for reviewer in &q.reviewers_involved {
                    let entry = acc
                        .entry(reviewer.as_str())
                        .or_insert_with(|| ReviewerStatistics {
                            reviewer: reviewer.clone(),
                            total_reviews: 0,
                            total_comments: 0,
                            total_approvals: 0,
                            average_comments_per_review: 0.0,
                        });
                    entry.total_reviews += 1;
                    entry.total_comments += q.review_comment_count as i64;
                }
                for approver in &q.approvers_involved {
                    if let Some(entry) = acc.get_mut(approver.as_str()) {
                        entry.total_approvals += 1;
                    }
                }
                acc
            },
        );

        let mut reviewer_stats: Vec<ReviewerStatistics> = per_reviewer
            .into_values()
            .filter(|s| s.total_reviews >= self.config.min_reviews_for_analysis)
            .map(|mut s| {
                s.average_comments_per_review = s.total_comments as f64 / s.total_reviews as f64;
                s
            })
            .collect();
        reviewer_stats.sort_by(|a, b| {
            b.total_reviews
                .cmp(&a.total_reviews)
                .then_with(|| a.reviewer.cmp(&b.reviewer))
        });

        ReviewEfficiencyAnalysis {
            total_prs: metrics.len(),
            overall_stats: OverallReviewStats {
                comment_stats: stats::int_stats(&comments),
                round_stats: stats::int_stats(&rounds),
                average_first_pass_rate,
                median_first_pass_rate: stats::median(&pass_rates),
                clean_pr_ratio: clean as f64 / metrics.len() as f64,
                meets_first_pass_target: average_first_pass_rate >= self.config.good_first_pass_rate,
            },
            reviewer_stats,
        }
    }
}

fn count_comments(events: &[&ReviewEvent]) -> i32 {
    events
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                ReviewEventKind::Commented | ReviewEventKind::ChangesRequested
            )
        })
        .count() as i32
}

/// Reviewer and approver sets, sorted
fn participants(events: &[&ReviewEvent]) -> (BTreeSet<String>, BTreeSet<String>) {
    events.iter().filter(|e| !e.actor.is_empty()).fold(
        (BTreeSet::new(), BTreeSet::new()),
        |(mut reviewers, mut approvers), e| {
            match e.kind {
                ReviewEventKind::Commented | ReviewEventKind::ChangesRequested => {
                    reviewers.insert(e.actor.clone());
                }
                ReviewEventKind::Approved => {
                    reviewers.insert(e.actor.clone());
                    approvers.insert(e.actor.clone());
                }
                _ => {}
            }
            (reviewers, approvers)
        },
    )
}

/// Score of the first substantive review response
fn first_review_pass_rate(events: &[&ReviewEvent]) -> f64 {
    events
        .iter()
        .find_map(|e| match e.kind {
            ReviewEventKind::Approved => Some(1.0),
            ReviewEventKind::ChangesRequested => Some(0.0),
            ReviewEventKind::Commented => Some(0.5),
            _ => None,
        })
        .unwrap_or(1.0)
}
