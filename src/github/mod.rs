use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod client;
pub use client::GitHubClient;

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// A pull request as returned by `GET /repos/{org}/{repo}/pulls`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: Option<String>,
    pub statuses_url: String,
    #[serde(default)]
    pub head: BranchRef,
    #[serde(default)]
    pub base: BranchRef,
}

impl PullRequest {
    /// The best link to show a person.
    pub fn link(&self) -> &str {
        self.html_url.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref", default)]
    pub name: String,
}

/// One commit status. Index 0 of a status list is the most recent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusEntry {
    #[serde(alias = "state")]
    pub status: String,
    #[serde(default)]
    pub target_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub head: String,
    pub base: String,
    pub title: String,
}

/// Raw outcome of a write call; the caller decides which codes count as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

/// The slice of the hosting platform's REST API the workflow needs.
pub trait HostingApi {
    fn create_pull_request(&self, repository: &str, request: &NewPullRequest) -> Result<ApiReply>;

    /// Open pull requests, most recent first.
    fn list_pull_requests(&self, repository: &str) -> Result<Vec<PullRequest>>;

    fn list_statuses(&self, statuses_url: &str) -> Result<Vec<StatusEntry>>;

    fn merge_pull_request(&self, repository: &str, number: u64) -> Result<ApiReply>;
}

/// The explicit token wins over the environment. A missing token is only
/// reported: unauthenticated calls fail with the API's own error.
pub fn resolve_token(explicit: Option<String>) -> Option<String> {
    let token = select_token(explicit, std::env::var(TOKEN_ENV).ok());
    if token.is_none() {
        tracing::warn!(
            "GitHub token not provided. Please provide via --token argument or via {TOKEN_ENV} env var."
        );
    }
    token
}

fn select_token(explicit: Option<String>, from_env: Option<String>) -> Option<String> {
    explicit
        .filter(|t| !t.trim().is_empty())
        .or(from_env.filter(|t| !t.trim().is_empty()))
}
