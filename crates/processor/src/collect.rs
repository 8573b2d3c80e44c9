//! Collect PRs from GitHub, analyze them and store the metrics

use common::models::{PrMetrics, ReviewEvent};
use github::client::ClientError;
use github::{convert, GitHubClient, GithubIssueEvent, GithubPr, GithubReview};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisConfig, PrAnalysisService};

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("GitHub API error: {0}")]
    GitHub(#[source] ClientError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl From<ClientError> for CollectError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::RateLimited { retry_after } => CollectError::RateLimited(retry_after),
            other => CollectError::GitHub(other),
        }
    }
}

/// Outcome of a collection run over one repository
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectProgress {
    pub prs_total: u32,
    pub prs_processed: u32,
    pub prs_stored: u32,
    pub prs_failed: u32,
    pub events_processed: u32,
}

pub struct Collector {
    pool: PgPool,
    client: GitHubClient,
    service: PrAnalysisService,
    max_age_days: u32,
}

impl Collector {
    pub fn new(
        pool: PgPool,
        github_token: Option<String>,
        max_age_days: u32,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            pool,
            client: GitHubClient::new(github_token),
            service: PrAnalysisService::new(config),
            max_age_days,
        }
    }

    /// Analyze every PR updated in the collection window and store the batch in one transaction.
    /// A rate limit stops the run; PRs analyzed so far are still stored.
    pub async fn collect_repo(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<CollectProgress, CollectError> {
        info!(
            "Starting collection for {}/{} (max {} days)",
            owner, name, self.max_age_days
        );

        let prs = self
            .client
            .fetch_prs_since(owner, name, None, self.max_age_days)
            .await?;

        let mut progress = CollectProgress {
            prs_total: prs.len() as u32,
            ..Default::default()
        };
        let mut batch = Vec::with_capacity(prs.len());

        for pr in &prs {
            match self.analyze_pr(owner, name, pr).await {
                Ok((metrics, events)) => {
                    progress.events_processed += events;
                    batch.push(metrics);
                }
                Err(CollectError::RateLimited(retry_after)) => {
                    warn!(
                        "Rate limited, stopping collection. Retry after {} seconds",
                        retry_after
                    );
                    let stored = db::pr_metrics::upsert_batch(&self.pool, &batch).await?;
                    info!("Stored {} PRs before stopping", stored);
                    return Err(CollectError::RateLimited(retry_after));
                }
                Err(e) => {
                    warn!("Error analyzing PR #{}: {}", pr.number, e);
                    progress.prs_failed += 1;
                }
            }
            progress.prs_processed += 1;

            if progress.prs_processed % 10 == 0 {
                info!(
                    "Progress: {}/{} PRs, {} events",
                    progress.prs_processed, progress.prs_total, progress.events_processed
                );
            }
        }

        progress.prs_stored = db::pr_metrics::upsert_batch(&self.pool, &batch).await? as u32;

        info!(
            "Collection complete for {}/{}: {} stored, {} failed",
            owner, name, progress.prs_stored, progress.prs_failed
        );
        Ok(progress)
    }

    async fn analyze_pr(
        &self,
        owner: &str,
        name: &str,
        pr: &GithubPr,
    ) -> Result<(PrMetrics, u32), CollectError> {
        debug!("Analyzing PR #{}: {}", pr.number, pr.title);

        let detail = self.client.get_pr(owner, name, pr.number).await?;
        let reviews = self.client.list_reviews(owner, name, pr.number).await?;
        let issue_events = self
            .client
            .list_issue_events(owner, name, pr.number)
            .await?;

        // File detail only refines size metrics, so a failure falls back to PR totals
        let files = match self.client.list_files(owner, name, pr.number).await {
            Ok(files) => files.iter().map(convert::file_change).collect(),
            Err(ClientError::RateLimited { retry_after }) => {
                return Err(CollectError::RateLimited(retry_after));
            }
            Err(e) => {
                debug!("Failed to fetch files for PR #{}: {}", pr.number, e);
                Vec::new()
            }
        };

        let repository = format!("{owner}/{name}");
        let record = convert::pr_record(&detail, &repository, &reviews);
        let events = review_events(&reviews, &issue_events);
        let metrics = self.service.analyze(&record, &events, &files);

        Ok((metrics, events.len() as u32))
    }
}

/// Review submissions and timeline events merged into one history
pub fn review_events(
    reviews: &[GithubReview],
    issue_events: &[GithubIssueEvent],
) -> Vec<ReviewEvent> {
    reviews
        .iter()
        .filter_map(convert::review_event)
        .chain(issue_events.iter().filter_map(convert::issue_event))
        .collect()
}
