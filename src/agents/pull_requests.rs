use crate::config::GitHubSettings;
use crate::error::{Result, UpdaterError};
use crate::github::{ApiReply, HostingApi, NewPullRequest, PullRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestOutcome {
    Created,
    AlreadyOpen,
    /// The update branch has no commits over mainline.
    NoChanges,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub pull: PullRequest,
    pub message: String,
}

/// PullRequestAgent opens and merges the update pull request of one repository.
pub struct PullRequestAgent<'a> {
    api: &'a dyn HostingApi,
    repository: String,
}

impl<'a> PullRequestAgent<'a> {
    pub fn new(api: &'a dyn HostingApi, repository: impl Into<String>) -> Self {
        Self {
            api,
            repository: repository.into(),
        }
    }

    /// Opens `update` → mainline. GitHub answers 422 both when the pull
    /// request already exists and when the branches do not differ; neither
    /// is an error.
    pub fn open_pull_request(&self, github: &GitHubSettings) -> Result<PullRequestOutcome> {
        let request = NewPullRequest {
            head: github.update_branch.clone(),
            base: github.mainline_branch.clone(),
            title: github.pull_request_title.clone(),
        };

        let reply = self.api.create_pull_request(&self.repository, &request)?;
        match reply.status {
            201 => Ok(PullRequestOutcome::Created),
            422 if has_no_commits(&reply.body) => Ok(PullRequestOutcome::NoChanges),
            422 => Ok(PullRequestOutcome::AlreadyOpen),
            _ => Err(api_error(reply)),
        }
    }

    /// Merges the most recent open pull request.
    pub fn merge_latest_pull_request(&self) -> Result<MergeOutcome> {
        let pull = self
            .api
            .list_pull_requests(&self.repository)?
            .into_iter()
            .next()
            .ok_or_else(|| UpdaterError::NoPullRequest(self.repository.clone()))?;

        tracing::info!(pull = pull.number, repository = %self.repository, "merging pull request");
        let reply = self.api.merge_pull_request(&self.repository, pull.number)?;
        match reply.status {
            200 | 204 => Ok(MergeOutcome {
                message: merge_message(&reply.body),
                pull,
            }),
            _ => Err(api_error(reply)),
        }
    }
}

fn api_error(reply: ApiReply) -> UpdaterError {
    UpdaterError::Api {
        status: reply.status,
        message: json_message(&reply.body).unwrap_or(reply.body),
    }
}

fn merge_message(body: &str) -> String {
    json_message(body).unwrap_or_else(|| "Pull Request successfully merged".to_string())
}

/// A 422 validation error of the form "No commits between master and update".
fn has_no_commits(body: &str) -> bool {
    let Ok(body) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    body.get("errors")
        .and_then(|errors| errors.as_array())
        .into_iter()
        .flatten()
        .filter_map(|error| error.get("message")?.as_str())
        .any(|message| message.starts_with("No commits between"))
}

/// GitHub puts a human readable `message` in most JSON replies.
fn json_message(body: &str) -> Option<String> {
    let body: serde_json::Value = serde_json::from_str(body).ok()?;
    body.get("message")?.as_str().map(str::to_string)
}
