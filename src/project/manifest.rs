use crate::agents::composer_editor::ComposerEdits;
use crate::error::{Result, UpdaterError};
use crate::utils::PathValidator;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "project.toml";

/// Per-project overrides read from `<templates>/<name>/project.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectManifest {
    /// Repository name on GitHub when it differs from the hyphenated project name
    pub github_name: Option<String>,
    /// Replaces the default package updaters when non-empty
    pub update_commands: Vec<UpdateCommand>,
    /// Shell commands run inside the build directory after overlay and patches
    pub extra_commands: Vec<String>,
    pub composer: Option<ComposerEdits>,
    pub smoke_tests: Vec<SmokeTestSpec>,
}

/// A package updater that runs only when `manifest` exists in the build directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommand {
    pub manifest: String,
    pub command: String,
}

impl UpdateCommand {
    pub fn new(manifest: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            manifest: manifest.into(),
            command: command.into(),
        }
    }
}

/// Lock-file updaters in the order they run.
pub fn default_update_commands() -> Vec<UpdateCommand> {
    vec![
        UpdateCommand::new(
            "composer.json",
            "composer update --prefer-dist --ignore-platform-reqs --no-interaction --no-suggest",
        ),
        UpdateCommand::new("Pipfile", "pipenv update"),
        UpdateCommand::new("Gemfile", "bundle update"),
        UpdateCommand::new("package.json", "npm update"),
    ]
}

/// Extra smoke tests declared by a project, run after the basic 200 check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SmokeTestSpec {
    Status {
        #[serde(default = "default_path")]
        path: String,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
    },
    Body {
        #[serde(default = "default_path")]
        path: String,
        pattern: String,
    },
}

fn default_path() -> String {
    "/".to_string()
}

fn default_expected_status() -> u16 {
    200
}

impl ProjectManifest {
    /// Reads the manifest in `template_dir`, or returns the empty manifest.
    pub fn load(template_dir: &Path) -> Result<Self> {
        let path = template_dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            UpdaterError::ProjectValidation(format!("Failed to read '{}': {e}", path.display()))
        })?;
        let manifest = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded project manifest");
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.github_name {
            PathValidator::validate_file_name(name, "github_name")?;
        }

        for update in &self.update_commands {
            PathValidator::validate_file_name(&update.manifest, "update_commands.manifest")?;
            if update.command.trim().is_empty() {
                return Err(UpdaterError::ProjectValidation(format!(
                    "update command for '{}' is empty",
                    update.manifest
                )));
            }
        }

        for spec in &self.smoke_tests {
            let path = match spec {
                SmokeTestSpec::Status { path, .. } | SmokeTestSpec::Body { path, .. } => path,
            };
            if !path.starts_with('/') {
                return Err(UpdaterError::ProjectValidation(format!(
                    "smoke test path '{path}' must start with '/'"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_manifest_is_empty() {
        let dir = tempdir().unwrap();
        let manifest = ProjectManifest::load(dir.path()).unwrap();
        assert!(manifest.github_name.is_none());
        assert!(manifest.update_commands.is_empty());
        assert!(manifest.smoke_tests.is_empty());
    }

    #[test]
    fn update_commands_keep_declaration_order() {
        let manifest = ProjectManifest::parse(
            r#"
[[update_commands]]
manifest = "package.json"
command = "yarn upgrade"

[[update_commands]]
manifest = "composer.json"
command = "composer update"
"#,
        )
        .unwrap();

        let manifests: Vec<_> = manifest
            .update_commands
            .iter()
            .map(|u| u.manifest.as_str())
            .collect();
        assert_eq!(manifests, ["package.json", "composer.json"]);
    }

    #[test]
    fn parses_smoke_tests_with_defaults() {
        let manifest = ProjectManifest::parse(
            r#"
[[smoke_tests]]
type = "status"
path = "/user/login"

[[smoke_tests]]
type = "body"
pattern = "Welcome to"
"#,
        )
        .unwrap();

        assert_eq!(
            manifest.smoke_tests,
            vec![
                SmokeTestSpec::Status {
                    path: "/user/login".to_string(),
                    expected_status: 200,
                },
                SmokeTestSpec::Body {
                    path: "/".to_string(),
                    pattern: "Welcome to".to_string(),
                },
            ]
        );
    }

    #[test]
    fn rejects_manifest_names_with_paths() {
        let err = ProjectManifest::parse(
            r#"
[[update_commands]]
manifest = "../composer.json"
command = "composer update"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, UpdaterError::ProjectValidation(_)));
    }

    #[test]
    fn rejects_relative_smoke_test_paths() {
        let err = ProjectManifest::parse("[[smoke_tests]]\ntype = \"status\"\npath = \"login\"")
            .unwrap_err();
        assert!(matches!(err, UpdaterError::ProjectValidation(_)));
    }

    #[test]
    fn default_updaters_run_composer_first() {
        let defaults = default_update_commands();
        assert_eq!(defaults.len(), 4);
        assert_eq!(defaults[0].manifest, "composer.json");
        assert_eq!(defaults[3], UpdateCommand::new("package.json", "npm update"));
    }
}
