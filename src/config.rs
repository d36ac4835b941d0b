use crate::error::{Result, UpdaterError};
use crate::utils::PathValidator;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "updater.toml";

/// Top-level tool configuration, read from `updater.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdaterConfig {
    /// Directory holding one sub-directory per template project
    pub templates_dir: PathBuf,
    pub github: GitHubSettings,
    pub polling: PollingSettings,
    pub testing: TestingSettings,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            github: GitHubSettings::default(),
            polling: PollingSettings::default(),
            testing: TestingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSettings {
    pub api_url: String,
    pub organization: String,
    pub clone_prefix: String,
    pub mainline_branch: String,
    pub update_branch: String,
    pub commit_message: String,
    pub pull_request_title: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            organization: "platformsh-templates".to_string(),
            clone_prefix: "git@github.com:".to_string(),
            mainline_branch: "master".to_string(),
            update_branch: "update".to_string(),
            commit_message: "Update to latest upstream".to_string(),
            pull_request_title: "Update to latest upstream".to_string(),
        }
    }
}

/// Bounds for the deployment status poll. Durations use jiff's friendly
/// format ("2s", "1m 30s") or ISO 8601.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingSettings {
    pub initial_backoff: String,
    pub max_backoff: String,
    pub timeout: String,
    pub max_attempts: u32,
    /// Wait applied once after every target URL is known; deployments lag
    /// behind the status reported to GitHub.
    pub settle_delay: String,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            initial_backoff: "2s".to_string(),
            max_backoff: "1m".to_string(),
            timeout: "30m".to_string(),
            max_attempts: 200,
            settle_delay: "10s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoTargetsPolicy {
    /// No preview URL means nothing was verified: refuse to merge.
    #[default]
    Block,
    /// Treat an empty test run as passing.
    Pass,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestingSettings {
    pub on_no_targets: NoTargetsPolicy,
    pub request_timeout: String,
}

impl Default for TestingSettings {
    fn default() -> Self {
        Self {
            on_no_targets: NoTargetsPolicy::Block,
            request_timeout: "30s".to_string(),
        }
    }
}

/// Resolved polling bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub settle_delay: Duration,
}

impl PollingSettings {
    pub fn policy(&self) -> Result<PollPolicy> {
        if self.max_attempts == 0 {
            return Err(UpdaterError::Config(
                "polling.max_attempts must be at least 1".to_string(),
            ));
        }

        let initial_backoff = parse_duration("polling.initial_backoff", &self.initial_backoff)?;
        let max_backoff = parse_duration("polling.max_backoff", &self.max_backoff)?;
        if max_backoff < initial_backoff {
            return Err(UpdaterError::Config(
                "polling.max_backoff must not be shorter than polling.initial_backoff".to_string(),
            ));
        }

        Ok(PollPolicy {
            initial_backoff,
            max_backoff,
            timeout: parse_duration("polling.timeout", &self.timeout)?,
            max_attempts: self.max_attempts,
            settle_delay: parse_duration("polling.settle_delay", &self.settle_delay)?,
        })
    }
}

impl TestingSettings {
    pub fn request_timeout(&self) -> Result<Duration> {
        parse_duration("testing.request_timeout", &self.request_timeout)
    }
}

impl UpdaterConfig {
    /// Load configuration from an explicit path, or from `updater.toml` in the
    /// working directory when it exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(UpdaterError::Config(format!(
                        "Config file '{}' not found",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default_path.is_file() {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            UpdaterError::Config(format!("Failed to read '{}': {e}", path.display()))
        })?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        // Surface bad durations at startup rather than mid-workflow.
        config.polling.policy()?;
        config.testing.request_timeout()?;
        config.github.validate()?;
        Ok(config)
    }
}

impl GitHubSettings {
    /// These values are spliced into generated git commands unquoted.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("github.organization", &self.organization),
            ("github.clone_prefix", &self.clone_prefix),
            ("github.mainline_branch", &self.mainline_branch),
            ("github.update_branch", &self.update_branch),
        ] {
            PathValidator::validate_shell_safe(value, key).map_err(|e| match e {
                UpdaterError::ProjectValidation(msg) => UpdaterError::Config(msg),
                other => other,
            })?;
        }
        Ok(())
    }
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration> {
    let signed: jiff::SignedDuration = raw
        .trim()
        .parse()
        .map_err(|e| UpdaterError::Config(format!("{key}: invalid duration '{raw}': {e}")))?;

    Duration::try_from(signed)
        .map_err(|e| UpdaterError::Config(format!("{key}: duration must not be negative: {e}")))
}
