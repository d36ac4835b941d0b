pub mod actions;
pub mod customizer;
pub mod manifest;

pub use actions::{Action, Phase};
pub use customizer::{ComposerCustomizer, Customizer, DefaultCustomizer};
pub use manifest::{ProjectManifest, SmokeTestSpec, UpdateCommand, default_update_commands};

use crate::error::{Result, UpdaterError};
use crate::utils::PathValidator;
use std::fs;
use std::path::{Path, PathBuf};

const BUILD_DIR: &str = "build";
const FILES_DIR: &str = "files";

/// A template project: the upstream clone in `build/` plus the local
/// customizations stored next to it.
#[derive(Debug, Clone)]
pub struct Project {
    name: String,
    template_dir: PathBuf,
    build_dir: PathBuf,
    manifest: ProjectManifest,
    update_commands: Vec<UpdateCommand>,
}

impl Project {
    /// Resolve `<templates_dir>/<name>` and read its optional `project.toml`.
    pub fn load(templates_dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        PathValidator::validate_file_name(name, "project name")?;
        let templates_dir = PathValidator::validate_templates_dir(templates_dir)?;

        let template_dir = templates_dir.join(name);
        if !template_dir.is_dir() {
            return Err(UpdaterError::ProjectValidation(format!(
                "Project '{}' not found in '{}'",
                name,
                templates_dir.display()
            )));
        }

        let manifest = ProjectManifest::load(&template_dir)?;
        Ok(Self::with_manifest(name, template_dir, manifest))
    }

    pub fn with_manifest(
        name: impl Into<String>,
        template_dir: impl Into<PathBuf>,
        manifest: ProjectManifest,
    ) -> Self {
        let template_dir = template_dir.into();
        let update_commands = if manifest.update_commands.is_empty() {
            default_update_commands()
        } else {
            manifest.update_commands.clone()
        };

        Self {
            name: name.into(),
            build_dir: template_dir.join(BUILD_DIR),
            template_dir,
            manifest,
            update_commands,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn files_dir(&self) -> PathBuf {
        self.template_dir.join(FILES_DIR)
    }

    pub fn manifest(&self) -> &ProjectManifest {
        &self.manifest
    }

    pub fn update_commands(&self) -> &[UpdateCommand] {
        &self.update_commands
    }

    /// Name of the repository on GitHub.
    pub fn repository_name(&self) -> String {
        match &self.manifest.github_name {
            Some(name) => name.clone(),
            None => self.name.replace('_', "-"),
        }
    }

    /// `*.patch` files of the template directory in lexical file name order.
    pub fn patch_files(&self) -> Result<Vec<PathBuf>> {
        let mut patches = Vec::new();
        for entry in fs::read_dir(&self.template_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "patch") {
                let path = PathValidator::validate_file_path(&path, &self.template_dir)?;
                PathValidator::validate_shell_safe(&path.to_string_lossy(), "patch path")?;
                patches.push(path);
            }
        }
        patches.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(patches)
    }

    /// The customization hook chosen by the project's manifest.
    pub fn customizer(&self) -> Box<dyn Customizer> {
        match &self.manifest.composer {
            Some(edits) => Box::new(ComposerCustomizer::new(edits.clone())),
            None => Box::new(DefaultCustomizer),
        }
    }
}
