use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Command failed with exit code {code}: {command}")]
    CommandFailed { command: String, code: i32 },

    #[error("GitHub API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error(
        "Timed out waiting for pull request #{pull} to deploy ({attempts} attempts over {}s)",
        elapsed.as_secs()
    )]
    PollTimeout {
        pull: u64,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("No open pull request found for '{0}'")]
    NoPullRequest(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, UpdaterError>;
