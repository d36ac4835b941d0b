use super::{Action, Project};
use crate::agents::composer_editor::{ComposerEdits, ComposerEditor};
use crate::error::Result;

/// Turns a freshly cloned template into the platform-ready project.
///
/// This is the one step projects are expected to specialise. Implementations
/// must be safe to run twice on the same build directory.
pub trait Customizer {
    fn customize(&self, project: &Project) -> Result<Vec<Action>>;
}

/// Overlay `files/`, apply `*.patch` files in name order, run the project's
/// extra commands, then refresh dependencies once more.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCustomizer;

impl DefaultCustomizer {
    /// The overlay and patch steps shared by every customizer.
    pub fn overlay_actions(project: &Project) -> Result<Vec<Action>> {
        let mut actions = Vec::new();
        let build_dir = project.build_dir().display();

        let files_dir = project.files_dir();
        if files_dir.is_dir() {
            actions.push(Action::shell(format!(
                "rsync -aP {}/ {}/",
                files_dir.display(),
                build_dir
            )));
        } else {
            tracing::debug!(project = project.name(), "no files/ overlay directory");
        }

        // A patch that reverse-applies cleanly is already in place.
        for patch in project.patch_files()? {
            let name = patch
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            actions.push(Action::shell(format!(
                "cd {build_dir} && if patch -p1 -R -s -f --dry-run < {0} > /dev/null 2>&1; then echo \"Patch {name} already applied, skipping.\"; else patch -p1 < {0}; fi",
                patch.display()
            )));
        }

        Ok(actions)
    }

    pub fn extra_actions(project: &Project) -> Vec<Action> {
        project
            .manifest()
            .extra_commands
            .iter()
            .map(|command| Action::shell(format!("cd {} && {}", project.build_dir().display(), command)))
            .collect()
    }
}

impl Customizer for DefaultCustomizer {
    fn customize(&self, project: &Project) -> Result<Vec<Action>> {
        let mut actions = Self::overlay_actions(project)?;
        actions.extend(Self::extra_actions(project));
        // Package managers may need a second pass once the platform files are in.
        actions.extend(project.package_update_actions());
        Ok(actions)
    }
}

/// Default customization plus structural edits to `composer.json` that the
/// composer CLI cannot express.
#[derive(Debug, Clone)]
pub struct ComposerCustomizer {
    edits: ComposerEdits,
}

impl ComposerCustomizer {
    pub fn new(edits: ComposerEdits) -> Self {
        Self { edits }
    }
}

impl Customizer for ComposerCustomizer {
    fn customize(&self, project: &Project) -> Result<Vec<Action>> {
        let mut actions = DefaultCustomizer::overlay_actions(project)?;

        let composer_path = project.build_dir().join("composer.json");
        let edits = self.edits.clone();
        actions.push(Action::native(
            format!("edit {}", composer_path.display()),
            move || ComposerEditor::new(&composer_path).apply(&edits),
        ));

        actions.extend(DefaultCustomizer::extra_actions(project));
        actions.extend(project.package_update_actions());
        Ok(actions)
    }
}
