use crate::error::{Result, UpdaterError};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Dependency changes applied to `composer.json` during customization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposerEdits {
    /// Packages added to (or re-pinned in) `require`
    pub require: BTreeMap<String, String>,
    /// Packages dropped from `require` and `require-dev`
    pub remove: Vec<String>,
}

/// Rewrites `composer.json` as raw JSON, keeping key order intact.
pub struct ComposerEditor {
    composer_path: PathBuf,
}

impl ComposerEditor {
    pub fn new<P: AsRef<Path>>(composer_path: P) -> Self {
        Self {
            composer_path: composer_path.as_ref().to_path_buf(),
        }
    }

    pub fn apply(&self, edits: &ComposerEdits) -> Result<()> {
        self.modify(|composer| {
            let require = composer
                .entry("require")
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| {
                    UpdaterError::ProjectValidation("composer.json 'require' is not an object".into())
                })?;

            for (package, constraint) in &edits.require {
                require.insert(package.clone(), Value::String(constraint.clone()));
            }

            for section in ["require", "require-dev"] {
                if let Some(packages) = composer.get_mut(section).and_then(Value::as_object_mut) {
                    for package in &edits.remove {
                        packages.shift_remove(package);
                    }
                }
            }

            Ok(())
        })
    }

    /// Load the document, let `edit` change it, and write it back with
    /// two-space indentation.
    pub fn modify<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<()>,
    {
        let mut document = self.load_document()?;
        let composer = document.as_object_mut().ok_or_else(|| {
            UpdaterError::ProjectValidation(format!(
                "'{}' does not contain a JSON object",
                self.composer_path.display()
            ))
        })?;

        edit(composer)?;

        let mut rendered = serde_json::to_string_pretty(&document)?;
        rendered.push('\n');
        fs::write(&self.composer_path, rendered)?;
        tracing::debug!(path = %self.composer_path.display(), "rewrote composer.json");
        Ok(())
    }

    fn load_document(&self) -> Result<Value> {
        let content = fs::read_to_string(&self.composer_path).map_err(|e| {
            UpdaterError::ProjectValidation(format!(
                "Failed to read '{}': {e}",
                self.composer_path.display()
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}
