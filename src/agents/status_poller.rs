use crate::config::PollPolicy;
use crate::error::{Result, UpdaterError};
use crate::github::{HostingApi, PullRequest, StatusEntry};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cmp::min;
use std::thread;
use std::time::{Duration, Instant};

const SUCCESS: &str = "success";

/// A pull request whose preview deployment is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub pull: u64,
    pub url: String,
}

/// What the most recent status says about a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Deployment {
    Ready(String),
    Building(String),
    NotBuilt,
}

fn inspect(statuses: &[StatusEntry]) -> Deployment {
    match statuses.first() {
        None => Deployment::NotBuilt,
        Some(latest) if latest.status != SUCCESS => Deployment::Building(latest.status.clone()),
        Some(latest) => match latest.target_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Deployment::Ready(url.to_string()),
            _ => Deployment::NotBuilt,
        },
    }
}

/// StatusPollerAgent waits for each open pull request to report a deployed
/// preview URL, with exponential backoff and a hard deadline per request.
pub struct StatusPollerAgent<'a> {
    api: &'a dyn HostingApi,
    policy: PollPolicy,
    show_progress: bool,
}

impl<'a> StatusPollerAgent<'a> {
    pub fn new(api: &'a dyn HostingApi, policy: PollPolicy) -> Self {
        Self {
            api,
            policy,
            show_progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// One target URL per open pull request of `repository`.
    pub fn resolve_target_urls(&self, repository: &str) -> Result<Vec<TargetUrl>> {
        let pulls = self.api.list_pull_requests(repository)?;
        tracing::info!(repository, count = pulls.len(), "open pull requests");

        let pb = ProgressBar::new(pulls.len() as u64);
        if !self.show_progress {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        let mut targets = Vec::with_capacity(pulls.len());
        for pull in &pulls {
            pb.set_message(format!("Waiting for #{}", pull.number));
            let url = self.wait_for_target_url(pull, &pb)?;
            pb.suspend(|| {
                println!(
                    "   {} #{} deployed at {}",
                    "✓".green(),
                    pull.number,
                    url.bright_cyan()
                )
            });
            targets.push(TargetUrl {
                pull: pull.number,
                url,
            });
            pb.inc(1);
        }
        pb.finish_and_clear();

        if !targets.is_empty() && !self.policy.settle_delay.is_zero() {
            tracing::info!(
                delay_secs = self.policy.settle_delay.as_secs(),
                "delaying tests until the deployment settles"
            );
            thread::sleep(self.policy.settle_delay);
        }

        Ok(targets)
    }

    fn wait_for_target_url(&self, pull: &PullRequest, pb: &ProgressBar) -> Result<String> {
        let started = Instant::now();
        let mut backoff = self.policy.initial_backoff;
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.api.list_statuses(&pull.statuses_url).map(|s| inspect(&s)) {
                Ok(Deployment::Ready(url)) => {
                    tracing::info!(pull = pull.number, attempts, %url, "deployment ready");
                    return Ok(url);
                }
                Ok(Deployment::Building(status)) => {
                    tracing::info!(
                        pull = pull.number,
                        %status,
                        "pull request {} is still building",
                        pull.link()
                    );
                }
                Ok(Deployment::NotBuilt) => {
                    tracing::info!(pull = pull.number, "pull request {} was not built yet", pull.link());
                }
                Err(err) => {
                    tracing::warn!(pull = pull.number, error = %err, "failed to read deployment status");
                }
            }

            let elapsed = started.elapsed();
            if attempts >= self.policy.max_attempts || elapsed >= self.policy.timeout {
                return Err(UpdaterError::PollTimeout {
                    pull: pull.number,
                    attempts,
                    elapsed,
                });
            }

            pb.set_message(format!("Waiting for #{} (attempt {})", pull.number, attempts + 1));
            thread::sleep(min(backoff, self.policy.timeout - elapsed));
            backoff = next_backoff(backoff, self.policy.max_backoff);
        }
    }
}

fn next_backoff(current: Duration, cap: Duration) -> Duration {
    min(current.saturating_mul(2), cap)
}
