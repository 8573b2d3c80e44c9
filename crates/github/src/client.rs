//! GitHub REST API client for fetching PRs, reviews, timeline events and files

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

const API_BASE: &str = "https://api.github.com";
/// Upper bound on pages fetched for a single listing
const MAX_PAGES: u32 = 50;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// GitHub API client
pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

/// User as returned by GitHub API
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub id: i64,
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubBranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

/// PR as returned by the list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GithubPr {
    pub id: i64,
    pub number: i32,
    pub title: String,
    pub state: String,
    pub user: Option<GithubUser>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub head: GithubBranchRef,
    pub base: GithubBranchRef,
}

/// PR as returned by the single-PR endpoint, with diff totals
#[derive(Debug, Clone, Deserialize)]
pub struct GithubPrDetail {
    #[serde(flatten)]
    pub pr: GithubPr,
    #[serde(default)]
    pub additions: i64,
    #[serde(default)]
    pub deletions: i64,
    #[serde(default)]
    pub changed_files: i64,
}

/// Review as returned by GitHub API
#[derive(Debug, Clone, Deserialize)]
pub struct GithubReview {
    pub id: i64,
    pub user: Option<GithubUser>,
    /// APPROVED, CHANGES_REQUESTED, COMMENTED, DISMISSED or PENDING
    pub state: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Issue timeline event (review requests, ready-for-review, merge)
#[derive(Debug, Clone, Deserialize)]
pub struct GithubIssueEvent {
    pub id: i64,
    pub event: String,
    pub actor: Option<GithubUser>,
    pub requested_reviewer: Option<GithubUser>,
    pub created_at: DateTime<Utc>,
}

/// Changed file as returned by the PR files endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct GithubFile {
    pub filename: String,
    /// added, removed, modified, renamed, copied, changed or unchanged
    pub status: String,
    pub additions: i64,
    pub deletions: i64,
    pub previous_filename: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, API_BASE)
    }

    /// Client against a GitHub Enterprise or mock endpoint
    pub fn with_base_url(token: Option<String>, base_url: &str) -> Self {
        let client = reqwest::Client::new();
        Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("pr-metrics/0.1"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(ref token) = self.token {
            if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, val);
            }
        }
        headers
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, ClientError> {
        debug!("GET {}", url);
        let resp = self.client.get(url).headers(self.headers()).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(url.to_string()));
        }
        if status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ClientError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch every page of a list endpoint
    async fn get_paginated<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        per_page: u32,
    ) -> Result<Vec<T>, ClientError> {
        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let items: Vec<T> = self.get(&page_url(url, page, per_page)).await?;
            let last = items.len() < per_page as usize;
            all.extend(items);
            if last {
                return Ok(all);
            }
        }
        warn!("Hit pagination limit of {} pages for {}", MAX_PAGES, url);
        Ok(all)
    }

    /// Fetch one page of PRs, most recently updated first
    pub async fn list_prs(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GithubPr>, ClientError> {
        let url = format!(
            "{}/repos/{}/{}/pulls?state=all&sort=updated&direction=desc",
            self.base_url, owner, repo
        );
        self.get(&page_url(&url, page, per_page)).await
    }

    /// Fetch a single PR with its diff totals
    pub async fn get_pr(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i32,
    ) -> Result<GithubPrDetail, ClientError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_url, owner, repo, pr_number
        );
        self.get(&url).await
    }

    /// Fetch all reviews for a PR
    pub async fn list_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i32,
    ) -> Result<Vec<GithubReview>, ClientError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.base_url, owner, repo, pr_number
        );
        self.get_paginated(&url, 100).await
    }

    /// Fetch issue events for a PR (review requests, merges)
    pub async fn list_issue_events(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i32,
    ) -> Result<Vec<GithubIssueEvent>, ClientError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/events",
            self.base_url, owner, repo, pr_number
        );
        self.get_paginated(&url, 100).await
    }

    /// Fetch changed files for a PR
    pub async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        pr_number: i32,
    ) -> Result<Vec<GithubFile>, ClientError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/files",
            self.base_url, owner, repo, pr_number
        );
        self.get_paginated(&url, 100).await
    }

    /// Fetch all PRs updated within the last `max_age_days`, handling pagination
    pub async fn fetch_prs_since(
        &self,
        owner: &str,
        repo: &str,
        since: Option<DateTime<Utc>>,
        max_age_days: u32,
    ) -> Result<Vec<GithubPr>, ClientError> {
        let cutoff =
            since.unwrap_or_else(|| Utc::now() - chrono::Duration::days(max_age_days as i64));

        let mut all_prs = Vec::new();
        let per_page = 100u32;

        for page in 1..=MAX_PAGES {
            info!("Fetching PRs page {} for {}/{}", page, owner, repo);
            let prs = self.list_prs(owner, repo, page, per_page).await?;
            let exhausted = prs.len() < per_page as usize;

            let before = all_prs.len();
            let fetched = prs.len();
            all_prs.extend(prs.into_iter().take_while(|pr| pr.updated_at >= cutoff));

            // Sorted by updated desc, so the first old PR ends the listing
            if all_prs.len() - before < fetched {
                debug!("Reached PRs older than cutoff, stopping pagination");
                break;
            }
            if exhausted {
                break;
            }
            if page == MAX_PAGES {
                warn!("Hit pagination limit of {} pages", MAX_PAGES);
            }
        }

        info!("Fetched {} PRs total for {}/{}", all_prs.len(), owner, repo);
        Ok(all_prs)
    }
}

fn page_url(url: &str, page: u32, per_page: u32) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}page={page}&per_page={per_page}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GitHubClient::new(None);
        assert!(client.token.is_none());
        assert_eq!(client.base_url, "https://api.github.com");

        let client = GitHubClient::with_base_url(Some("test".to_string()), "http://localhost:9/");
        assert_eq!(client.token, Some("test".to_string()));
        assert_eq!(client.base_url, "http://localhost:9");
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            page_url("https://x/pulls/1/files", 2, 100),
            "https://x/pulls/1/files?page=2&per_page=100"
        );
        assert_eq!(
            page_url("https://x/pulls?state=all", 1, 50),
            "https://x/pulls?state=all&page=1&per_page=50"
        );
    }

    #[test]
    fn test_pr_detail_deserializes_flattened() {
        let json = r#"{
            "id": 99, "number": 7, "title": "Add cache", "state": "closed",
            "user": {"id": 1, "login": "alice"},
            "created_at": "2026-01-01T10:00:00Z", "updated_at": "2026-01-02T10:00:00Z",
            "merged_at": "2026-01-02T09:00:00Z", "closed_at": "2026-01-02T09:00:00Z",
            "head": {"ref": "feature/cache"}, "base": {"ref": "main"},
            "additions": 120, "deletions": 30, "changed_files": 4
        }"#;
        let detail: GithubPrDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.pr.number, 7);
        assert_eq!(detail.pr.head.name, "feature/cache");
        assert_eq!(detail.additions, 120);
        assert_eq!(detail.changed_files, 4);
    }
}
