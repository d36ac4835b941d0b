use crate::error::{Result, UpdaterError};
use std::path::{Path, PathBuf};

/// Characters that would change the meaning of a generated shell command line.
const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '<', '>', '(', ')', '"', '\'', '\\', '*', '?', '\n', '\r', ' ', '\t',
];

/// Guards the values that get interpolated into generated shell commands.
pub struct PathValidator;

impl PathValidator {
    /// Validates and canonicalises the templates directory.
    pub fn validate_templates_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            UpdaterError::ProjectValidation(format!(
                "Invalid templates directory '{}': {e}",
                path.display()
            ))
        })?;

        if !canonical.is_dir() {
            return Err(UpdaterError::ProjectValidation(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        const FORBIDDEN: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

        for forbidden in FORBIDDEN {
            let forbidden_path = Path::new(forbidden);

            if path.starts_with(forbidden_path) || canonical.starts_with(forbidden_path) {
                return Err(UpdaterError::ProjectValidation(format!(
                    "Access to system directory '{}' is not allowed",
                    forbidden
                )));
            }

            if let Ok(canonical_forbidden) = forbidden_path.canonicalize() {
                if canonical.starts_with(&canonical_forbidden) {
                    return Err(UpdaterError::ProjectValidation(format!(
                        "Access to system directory '{}' is not allowed",
                        forbidden
                    )));
                }
            }
        }

        Self::validate_shell_safe(&canonical.to_string_lossy(), "templates directory")?;

        Ok(canonical)
    }

    /// Ensures the file path resides inside the provided base directory.
    pub fn validate_file_path(
        file_path: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let file_path = file_path.as_ref();
        let base_dir = base_dir.as_ref();

        let canonical_file = file_path.canonicalize().map_err(|e| {
            UpdaterError::ProjectValidation(format!(
                "Invalid file path '{}': {e}",
                file_path.display()
            ))
        })?;

        let canonical_base = base_dir.canonicalize().map_err(|e| {
            UpdaterError::ProjectValidation(format!(
                "Invalid base directory '{}': {e}",
                base_dir.display()
            ))
        })?;

        if !canonical_file.starts_with(&canonical_base) {
            return Err(UpdaterError::ProjectValidation(
                "File path is outside the allowed directory".to_string(),
            ));
        }

        Ok(canonical_file)
    }

    /// Rejects values that cannot be spliced into a command line unquoted.
    pub fn validate_shell_safe(value: &str, what: &str) -> Result<()> {
        if value.is_empty() {
            return Err(UpdaterError::ProjectValidation(format!("{what} is empty")));
        }

        if let Some(ch) = SHELL_METACHARACTERS.iter().find(|c| value.contains(**c)) {
            return Err(UpdaterError::ProjectValidation(format!(
                "{what} '{}' contains unsupported character {:?}",
                value.escape_debug(),
                ch
            )));
        }

        Ok(())
    }

    /// Project names and manifest file names are single path components.
    pub fn validate_file_name(value: &str, what: &str) -> Result<()> {
        Self::validate_shell_safe(value, what)?;

        if value.contains('/') || value == "." || value == ".." {
            return Err(UpdaterError::ProjectValidation(format!(
                "{what} '{value}' must be a plain file name"
            )));
        }

        Ok(())
    }
}
