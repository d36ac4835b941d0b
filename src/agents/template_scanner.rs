use crate::error::Result;
use crate::project::Project;
use crate::project::manifest::MANIFEST_FILE;
use crate::utils::PathValidator;
use std::fs;
use std::path::{Path, PathBuf};

/// TemplateScannerAgent discovers the projects kept in the templates directory.
pub struct TemplateScannerAgent {
    templates_dir: PathBuf,
}

impl TemplateScannerAgent {
    pub fn new<P: AsRef<Path>>(templates_dir: P) -> Result<Self> {
        let templates_dir = PathValidator::validate_templates_dir(templates_dir)?;
        Ok(Self { templates_dir })
    }

    /// Project names, sorted. Hidden directories and names that cannot be
    /// used in generated commands are ignored.
    pub fn project_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.templates_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if PathValidator::validate_file_name(&name, "project name").is_err() {
                tracing::warn!(name = %name, "skipping template directory with unsupported name");
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    pub fn inspect(&self, name: &str) -> Result<TemplateInfo> {
        let project = Project::load(&self.templates_dir, name)?;
        Ok(TemplateInfo {
            has_overlay: project.files_dir().is_dir(),
            patch_count: project.patch_files()?.len(),
            has_manifest: project.template_dir().join(MANIFEST_FILE).is_file(),
            is_cloned: project.build_dir().join(".git").is_dir(),
            repository: project.repository_name(),
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInfo {
    pub name: String,
    pub repository: String,
    pub has_overlay: bool,
    pub patch_count: usize,
    pub has_manifest: bool,
    pub is_cloned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_project_directories_only() {
        let dir = tempdir().unwrap();
        for name in ["wordpress", "drupal_8", ".cache", "bad name"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("README.md"), "").unwrap();

        let scanner = TemplateScannerAgent::new(dir.path()).unwrap();
        assert_eq!(scanner.project_names().unwrap(), ["drupal_8", "wordpress"]);
    }

    #[test]
    fn inspect_reports_template_layout() {
        let dir = tempdir().unwrap();
        let template = dir.path().join("drupal_8");
        fs::create_dir_all(template.join("files")).unwrap();
        fs::create_dir_all(template.join("build/.git")).unwrap();
        fs::write(template.join("a.patch"), "").unwrap();
        fs::write(template.join("project.toml"), "github_name = \"drupal8\"\n").unwrap();

        let info = TemplateScannerAgent::new(dir.path())
            .unwrap()
            .inspect("drupal_8")
            .unwrap();
        assert_eq!(
            info,
            TemplateInfo {
                name: "drupal_8".to_string(),
                repository: "drupal8".to_string(),
                has_overlay: true,
                patch_count: 1,
                has_manifest: true,
                is_cloned: true,
            }
        );
    }
}
