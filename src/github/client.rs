use super::{ApiReply, HostingApi, NewPullRequest, PullRequest, StatusEntry};
use crate::config::GitHubSettings;
use crate::error::{Result, UpdaterError};
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("template-updater/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 2048;

/// Blocking GitHub REST client scoped to one organization.
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    organization: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        let api_url = Url::parse(&settings.api_url).map_err(|e| UpdaterError::InvalidUrl {
            url: settings.api_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_url,
            organization: settings.organization.clone(),
            token,
        })
    }

    pub fn pulls_url(&self, repository: &str) -> Result<Url> {
        self.endpoint(&format!(
            "repos/{}/{}/pulls",
            self.organization, repository
        ))
    }

    pub fn merge_url(&self, repository: &str, number: u64) -> Result<Url> {
        self.endpoint(&format!(
            "repos/{}/{}/pulls/{}/merge",
            self.organization, repository, number
        ))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        // Keep any path prefix of the configured base (GitHub Enterprise uses /api/v3).
        let mut base = self.api_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path).map_err(|e| UpdaterError::InvalidUrl {
            url: format!("{base}{path}"),
            reason: e.to_string(),
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "GitHub request");
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/vnd.github+json");
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("token {token}")),
            None => builder,
        }
    }

    fn reply(response: Response) -> Result<ApiReply> {
        let status = response.status().as_u16();
        let body = response.text()?;
        tracing::debug!(status, "GitHub response");
        Ok(ApiReply { status, body })
    }

    /// Fails with a structured API error unless the response is 2xx.
    fn expect_success(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let mut message = response.text().unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let cut = message
                .char_indices()
                .map(|(i, _)| i)
                .take_while(|i| *i <= MAX_ERROR_BODY)
                .last()
                .unwrap_or(0);
            message.truncate(cut);
        }
        Err(UpdaterError::Api { status, message })
    }
}

impl HostingApi for GitHubClient {
    fn create_pull_request(&self, repository: &str, request: &NewPullRequest) -> Result<ApiReply> {
        let response = self
            .request(Method::POST, self.pulls_url(repository)?)
            .json(request)
            .send()?;
        Self::reply(response)
    }

    fn list_pull_requests(&self, repository: &str) -> Result<Vec<PullRequest>> {
        let response = self
            .request(Method::GET, self.pulls_url(repository)?)
            .send()?;
        Ok(Self::expect_success(response)?.json()?)
    }

    fn list_statuses(&self, statuses_url: &str) -> Result<Vec<StatusEntry>> {
        let url = Url::parse(statuses_url).map_err(|e| UpdaterError::InvalidUrl {
            url: statuses_url.to_string(),
            reason: e.to_string(),
        })?;
        let response = self.request(Method::GET, url).send()?;
        Ok(Self::expect_success(response)?.json()?)
    }

    fn merge_pull_request(&self, repository: &str, number: u64) -> Result<ApiReply> {
        let response = self
            .request(Method::PUT, self.merge_url(repository, number)?)
            .send()?;
        Self::reply(response)
    }
}
