//! Background sync service

use chrono::{DateTime, Utc};
use common::config::TrackedRepo;
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::analysis::AnalysisConfig;
use crate::collect::{CollectError, Collector};

/// Configuration for the sync service
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between sync runs
    pub interval: Duration,
    /// How far back each run looks for PRs (days)
    pub max_age_days: u32,
    /// GitHub token for API access
    pub github_token: Option<String>,
    pub repos: Vec<TrackedRepo>,
    pub analysis: AnalysisConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(6 * 60 * 60), // 6 hours
            max_age_days: 90,
            github_token: None,
            repos: Vec::new(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl SyncConfig {
    /// None when the sync interval is zero
    pub fn from_config(config: &common::Config) -> Option<Self> {
        if config.sync_interval_hours == 0 {
            return None;
        }
        Some(Self {
            interval: Duration::from_secs(config.sync_interval_hours as u64 * 60 * 60),
            max_age_days: config.max_age_days,
            github_token: config.github_token.clone(),
            repos: config.tracked_repos.clone(),
            analysis: AnalysisConfig::from(config),
        })
    }
}

/// Background sync service that periodically collects all tracked repos
pub struct SyncService {
    pool: PgPool,
    config: SyncConfig,
}

impl SyncService {
    pub fn new(pool: PgPool, config: SyncConfig) -> Self {
        Self { pool, config }
    }

    /// Start the background sync loop
    pub async fn run(self) {
        info!(
            "Starting sync service (interval: {:?})",
            self.config.interval
        );

        let mut ticker = interval(self.config.interval);

        // Skip the first immediate tick - let the server start up first
        ticker.tick().await;

        loop {
            ticker.tick().await;
            info!("Starting scheduled sync of all tracked repos");
            self.sync_all().await;
        }
    }

    /// Collect every tracked repository; failures are logged and the loop moves on
    async fn sync_all(&self) {
        if self.config.repos.is_empty() {
            info!("No tracked repos to sync");
            return;
        }

        info!("Syncing {} tracked repos", self.config.repos.len());

        let collector = Collector::new(
            self.pool.clone(),
            self.config.github_token.clone(),
            self.config.max_age_days,
            self.config.analysis.clone(),
        );

        for repo in &self.config.repos {
            info!("Syncing {}/{}", repo.owner, repo.name);

            match collector.collect_repo(&repo.owner, &repo.name).await {
                Ok(progress) => {
                    info!(
                        "Synced {}/{}: {} PRs stored, {} events",
                        repo.owner, repo.name, progress.prs_stored, progress.events_processed
                    );
                }
                Err(CollectError::RateLimited(retry_after)) => {
                    warn!(
                        "Rate limited while syncing {}/{}. Pausing for {} seconds",
                        repo.owner, repo.name, retry_after
                    );
                    tokio::time::sleep(Duration::from_secs(retry_after)).await;
                }
                Err(e) => {
                    error!("Failed to sync {}/{}: {}", repo.owner, repo.name, e);
                }
            }

            // Small delay between repos to be nice to GitHub
            tokio::time::sleep(Duration::from_secs(2)).await;
        }

        info!("Sync complete");
        self.prune().await;
    }

    /// Drop PR metrics not refreshed within `max_age_days`, and rollups older than that
    async fn prune(&self) {
        let cutoff = retention_cutoff(Utc::now(), self.config.max_age_days);

        match db::pr_metrics::delete_collected_before(&self.pool, cutoff).await {
            Ok(0) => {}
            Ok(n) => info!("Pruned {} PR metrics collected before {}", n, cutoff),
            Err(e) => error!("Failed to prune PR metrics: {}", e),
        }
        match db::aggregated::delete_generated_before(&self.pool, cutoff).await {
            Ok(0) => {}
            Ok(n) => info!("Pruned {} rollups generated before {}", n, cutoff),
            Err(e) => error!("Failed to prune rollups: {}", e),
        }
    }
}

fn retention_cutoff(now: DateTime<Utc>, max_age_days: u32) -> DateTime<Utc> {
    now - chrono::Duration::days(max_age_days as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_disables_sync() {
        let mut config = common::Config::from_env();
        config.sync_interval_hours = 0;
        assert!(SyncConfig::from_config(&config).is_none());

        config.sync_interval_hours = 2;
        config.tracked_repos = common::config::parse_repo_list("acme/api");
        let sync = SyncConfig::from_config(&config).unwrap();
        assert_eq!(sync.interval, Duration::from_secs(7200));
        assert_eq!(sync.repos.len(), 1);
    }

    #[test]
    fn test_retention_cutoff() {
        use chrono::TimeZone;
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        assert_eq!(
            retention_cutoff(now, 90),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
