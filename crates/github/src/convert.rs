//! Conversion from GitHub API payloads to domain records

use common::models::{FileChangeRecord, PullRequestRecord, ReviewEvent, ReviewEventKind};

use crate::client::{GithubFile, GithubIssueEvent, GithubPrDetail, GithubReview, GithubUser};

/// Login used when GitHub reports a deleted account
const GHOST: &str = "ghost";

fn login(user: &Option<GithubUser>) -> String {
    user.as_ref()
        .map_or_else(|| GHOST.to_string(), |u| u.login.clone())
}

/// Build the PR record. `first_reviewed_at` only counts comments, approvals
/// and change requests; dismissed and pending reviews are ignored.
pub fn pr_record(
    detail: &GithubPrDetail,
    repository: &str,
    reviews: &[GithubReview],
) -> PullRequestRecord {
    let pr = &detail.pr;
    let events: Vec<ReviewEvent> = reviews.iter().filter_map(review_event).collect();
    let first_reviewed_at = events
        .iter()
        .filter(|e| e.kind.is_review_response())
        .map(|e| e.created_at)
        .min();
    let last_approved_at = events
        .iter()
        .filter(|e| e.kind == ReviewEventKind::Approved)
        .map(|e| e.created_at)
        .max();

    PullRequestRecord {
        id: pr.id.to_string(),
        number: pr.number,
        title: pr.title.clone(),
        author: login(&pr.user),
        repository: repository.to_string(),
        created_at: pr.created_at,
        merged_at: pr.merged_at,
        first_reviewed_at,
        last_approved_at,
        additions: detail.additions,
        deletions: detail.deletions,
        head_branch: pr.head.name.clone(),
        base_branch: pr.base.name.clone(),
    }
}

/// Map a submitted review to an event; pending reviews have no timestamp and are skipped
pub fn review_event(review: &GithubReview) -> Option<ReviewEvent> {
    let created_at = review.submitted_at?;
    let kind = match review.state.to_ascii_uppercase().as_str() {
        "APPROVED" => ReviewEventKind::Approved,
        "CHANGES_REQUESTED" => ReviewEventKind::ChangesRequested,
        "COMMENTED" => ReviewEventKind::Commented,
        "DISMISSED" => ReviewEventKind::Dismissed,
        other => ReviewEventKind::Unknown(other.to_ascii_lowercase()),
    };
    let actor = login(&review.user);
    Some(ReviewEvent {
        kind,
        created_at,
        reviewer: Some(actor.clone()),
        actor,
    })
}

/// Map the issue events that matter for review timing; everything else is dropped
pub fn issue_event(event: &GithubIssueEvent) -> Option<ReviewEvent> {
    let kind = match event.event.as_str() {
        "review_requested" => ReviewEventKind::Requested,
        "ready_for_review" => ReviewEventKind::ReadyForReview,
        "merged" => ReviewEventKind::Merged,
        _ => return None,
    };
    Some(ReviewEvent {
        kind,
        created_at: event.created_at,
        actor: login(&event.actor),
        reviewer: event.requested_reviewer.as_ref().map(|u| u.login.clone()),
    })
}

pub fn file_change(file: &GithubFile) -> FileChangeRecord {
    FileChangeRecord {
        file_name: file.filename.clone(),
        file_type: file_extension(&file.filename),
        lines_added: file.additions,
        lines_deleted: file.deletions,
        is_new_file: file.status == "added",
        is_deleted: file.status == "removed",
        is_renamed: file.status == "renamed" || file.previous_filename.is_some(),
    }
}

/// Extension with its leading dot, or empty for files such as `Makefile` or `.env`
fn file_extension(path: &str) -> String {
    let base = path.rsplit('/').next().unwrap_or(path);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{GithubBranchRef, GithubPr};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, hour, 0, 0).unwrap()
    }

    fn user(login: &str) -> Option<GithubUser> {
        Some(GithubUser {
            id: 1,
            login: login.to_string(),
        })
    }

    fn make_detail() -> GithubPrDetail {
        GithubPrDetail {
            pr: GithubPr {
                id: 4242,
                number: 17,
                title: "Speed up parser".to_string(),
                state: "closed".to_string(),
                user: user("alice"),
                created_at: at(8),
                updated_at: at(15),
                merged_at: Some(at(14)),
                closed_at: Some(at(14)),
                head: GithubBranchRef {
                    name: "feat/parser".to_string(),
                },
                base: GithubBranchRef {
                    name: "main".to_string(),
                },
            },
            additions: 90,
            deletions: 12,
            changed_files: 3,
        }
    }

    fn make_review(state: &str, submitted_at: Option<DateTime<Utc>>) -> GithubReview {
        GithubReview {
            id: 1,
            user: user("bob"),
            state: state.to_string(),
            submitted_at,
        }
    }

    #[test]
    fn test_pr_record_review_timestamps() {
        let reviews = vec![
            make_review("APPROVED", Some(at(12))),
            make_review("COMMENTED", Some(at(10))),
            make_review("APPROVED", Some(at(13))),
            make_review("PENDING", None),
        ];
        let record = pr_record(&make_detail(), "acme/parser", &reviews);
        assert_eq!(record.id, "4242");
        assert_eq!(record.repository, "acme/parser");
        assert_eq!(record.author, "alice");
        assert_eq!(record.first_reviewed_at, Some(at(10)));
        assert_eq!(record.last_approved_at, Some(at(13)));
        assert_eq!(record.head_branch, "feat/parser");
        assert_eq!(record.additions, 90);
    }

    #[test]
    fn test_first_reviewed_at_skips_dismissed_reviews() {
        let reviews = vec![
            make_review("DISMISSED", Some(at(9))),
            make_review("PENDING", None),
            make_review("CHANGES_REQUESTED", Some(at(11))),
        ];
        let record = pr_record(&make_detail(), "acme/parser", &reviews);
        assert_eq!(record.first_reviewed_at, Some(at(11)));
        assert!(record.last_approved_at.is_none());

        let only_dismissed = vec![make_review("DISMISSED", Some(at(9)))];
        let record = pr_record(&make_detail(), "acme/parser", &only_dismissed);
        assert!(record.first_reviewed_at.is_none());
    }

    #[test]
    fn test_pr_record_without_reviews() {
        let mut detail = make_detail();
        detail.pr.user = None;
        let record = pr_record(&detail, "acme/parser", &[]);
        assert_eq!(record.author, "ghost");
        assert!(record.first_reviewed_at.is_none());
        assert!(record.last_approved_at.is_none());
    }

    #[test]
    fn test_review_event_states() {
        let approved = review_event(&make_review("APPROVED", Some(at(9)))).unwrap();
        assert_eq!(approved.kind, ReviewEventKind::Approved);
        assert_eq!(approved.reviewer.as_deref(), Some("bob"));

        let changes = review_event(&make_review("CHANGES_REQUESTED", Some(at(9)))).unwrap();
        assert_eq!(changes.kind, ReviewEventKind::ChangesRequested);

        let odd = review_event(&make_review("SOMETHING_NEW", Some(at(9)))).unwrap();
        assert_eq!(
            odd.kind,
            ReviewEventKind::Unknown("something_new".to_string())
        );

        assert!(review_event(&make_review("PENDING", None)).is_none());
    }

    #[test]
    fn test_issue_event_mapping() {
        let make = |name: &str| GithubIssueEvent {
            id: 1,
            event: name.to_string(),
            actor: user("alice"),
            requested_reviewer: user("carol"),
            created_at: at(9),
        };

        let requested = issue_event(&make("review_requested")).unwrap();
        assert_eq!(requested.kind, ReviewEventKind::Requested);
        assert_eq!(requested.actor, "alice");
        assert_eq!(requested.reviewer.as_deref(), Some("carol"));

        assert_eq!(
            issue_event(&make("ready_for_review")).unwrap().kind,
            ReviewEventKind::ReadyForReview
        );
        assert_eq!(
            issue_event(&make("merged")).unwrap().kind,
            ReviewEventKind::Merged
        );
        assert!(issue_event(&make("labeled")).is_none());
    }

    #[test]
    fn test_file_change() {
        let file = GithubFile {
            filename: "src/lib/Parser.RS".to_string(),
            status: "added".to_string(),
            additions: 40,
            deletions: 0,
            previous_filename: None,
        };
        let record = file_change(&file);
        assert_eq!(record.file_type, ".rs");
        assert!(record.is_new_file);
        assert!(!record.is_renamed);

        let renamed = GithubFile {
            filename: "docs/Makefile".to_string(),
            status: "renamed".to_string(),
            additions: 1,
            deletions: 1,
            previous_filename: Some("Makefile".to_string()),
        };
        let record = file_change(&renamed);
        assert_eq!(record.file_type, "");
        assert!(record.is_renamed);
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a/b.tar.gz"), ".gz");
        assert_eq!(file_extension(".env"), "");
        assert_eq!(file_extension("dir.v2/README"), "");
    }
}
