use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use common::models::{
    FileChangeRecord, PullRequestRecord, ReviewEvent, ReviewEventKind, SizeCategory,
};
use processor::stats;
use processor::PrAnalysisService;

fn make_record(additions: i64, deletions: i64) -> PullRequestRecord {
    PullRequestRecord {
        id: "1".to_string(),
        number: 1,
        title: "Property PR".to_string(),
        author: "alice".to_string(),
        repository: "acme/api".to_string(),
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap(),
        merged_at: None,
        first_reviewed_at: None,
        last_approved_at: None,
        additions,
        deletions,
        head_branch: "feature".to_string(),
        base_branch: "main".to_string(),
    }
}

fn file_strategy() -> impl Strategy<Value = FileChangeRecord> {
    (
        prop_oneof![
            Just("src/a.rs"),
            Just("src/deep/b.go"),
            Just("docs/c.md"),
            Just("d.sql"),
            Just("Makefile"),
        ],
        0i64..5_000,
        0i64..5_000,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(name, added, deleted, new, removed, renamed)| {
            let file_type = name
                .rsplit_once('.')
                .map(|(_, ext)| format!(".{ext}"))
                .unwrap_or_default();
            FileChangeRecord {
                file_name: name.to_string(),
                file_type,
                lines_added: added,
                lines_deleted: deleted,
                is_new_file: new,
                is_deleted: removed,
                is_renamed: renamed,
            }
        })
}

fn event_strategy() -> impl Strategy<Value = ReviewEvent> {
    (
        prop_oneof![
            Just(ReviewEventKind::Requested),
            Just(ReviewEventKind::Commented),
            Just(ReviewEventKind::Approved),
            Just(ReviewEventKind::ChangesRequested),
        ],
        0i64..10_000,
        prop_oneof![Just("bob"), Just("carol")],
    )
        .prop_map(|(kind, minutes, who)| ReviewEvent {
            kind,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap()
                + Duration::minutes(minutes),
            actor: who.to_string(),
            reviewer: Some(who.to_string()),
        })
}

proptest! {
    /// Complexity stays within its bounds, including zero-line, zero-file input
    #[test]
    fn complexity_score_is_bounded(
        additions in 0i64..100_000,
        deletions in 0i64..100_000,
        files in prop::collection::vec(file_strategy(), 0..20),
        events in prop::collection::vec(event_strategy(), 0..30),
    ) {
        let service = PrAnalysisService::default();
        let metrics = service.analyze(&make_record(additions, deletions), &events, &files);
        prop_assert!(metrics.complexity_score >= 0.1);
        prop_assert!(metrics.complexity_score <= 10.0);

        let basic = service.analyze_basic(&make_record(additions, deletions));
        prop_assert!((0.1..=10.0).contains(&basic.complexity_score));
    }

    #[test]
    fn duration_stats_are_ordered(ms in prop::collection::vec(0i64..10_000_000_000, 1..50)) {
        let durations: Vec<Duration> = ms.iter().map(|&v| Duration::milliseconds(v)).collect();
        let s = stats::duration_stats(&durations);

        prop_assert_eq!(s.count, durations.len());
        prop_assert!(s.min <= s.median);
        prop_assert!(s.median <= s.max);
        prop_assert_eq!(s.percentiles.p50, s.median);

        // Mean is rounded to the millisecond
        let reconstructed = s.mean.num_milliseconds() as f64 * s.count as f64;
        let sum = s.sum.num_milliseconds() as f64;
        prop_assert!((reconstructed - sum).abs() <= s.count as f64);
    }

    #[test]
    fn float_stats_are_ordered(values in prop::collection::vec(-1e6f64..1e6, 1..50)) {
        let s = stats::float_stats(&values);
        prop_assert!(s.min <= s.median && s.median <= s.max);
        prop_assert!((s.percentiles.p50 - s.median).abs() <= 1e-6);
        prop_assert!((s.mean * s.count as f64 - s.sum).abs() <= 1e-6 * s.sum.abs().max(1.0));
    }

    #[test]
    fn size_category_is_monotonic(a in 0i64..2_000, b in 0i64..2_000) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            SizeCategory::from_lines_changed(low) <= SizeCategory::from_lines_changed(high)
        );
    }

    #[test]
    fn review_efficiency_is_inverse_rounds(rounds in 1i32..50, comments in 0i32..500) {
        let mut metrics = PrAnalysisService::default().analyze_basic(&make_record(10, 0));
        metrics.quality_metrics.review_round_count = rounds;
        metrics.quality_metrics.review_comment_count = comments;
        let expected = if rounds == 1 { 1.0 } else { 1.0 / rounds as f64 };
        prop_assert_eq!(metrics.review_efficiency(), expected);
    }
}

#[test]
fn size_category_boundaries() {
    let cases = [
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
        assert_eq!(SizeCategory::from_lines_changed(lines), expected, "{lines} lines");
    }
}
