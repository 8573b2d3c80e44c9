//! GitHub API client supplying pull requests, review history and file detail

pub mod client;
pub mod convert;

pub use client::{
    ClientError, GitHubClient, GithubBranchRef, GithubFile, GithubIssueEvent, GithubPr,
    GithubPrDetail, GithubReview, GithubUser,
};
