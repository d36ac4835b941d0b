use super::Project;
use crate::config::GitHubSettings;
use crate::error::Result;
use std::fmt;

/// One step of a workflow phase.
pub enum Action {
    /// A command line handed to `sh -c`
    Shell(String),
    /// An in-process task, e.g. rewriting `composer.json`
    Native {
        label: String,
        task: Box<dyn Fn() -> Result<()>>,
    },
}

impl Action {
    pub fn shell(command: impl Into<String>) -> Self {
        Action::Shell(command.into())
    }

    pub fn native(label: impl Into<String>, task: impl Fn() -> Result<()> + 'static) -> Self {
        Action::Native {
            label: label.into(),
            task: Box::new(task),
        }
    }

    pub fn as_shell(&self) -> Option<&str> {
        match self {
            Action::Shell(command) => Some(command),
            Action::Native { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shell(command) => f.write_str(command),
            Action::Native { label, .. } => write!(f, "<{label}>"),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shell(command) => f.debug_tuple("Shell").field(command).finish(),
            Action::Native { label, .. } => f.debug_struct("Native").field("label", label).finish(),
        }
    }
}

/// Phases that are expressed as generated commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Phase {
    Cleanup,
    Init,
    Update,
    Platformify,
    Branch,
    Push,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Cleanup => "cleanup",
            Phase::Init => "init",
            Phase::Update => "update",
            Phase::Platformify => "platformify",
            Phase::Branch => "branch",
            Phase::Push => "push",
        };
        f.write_str(label)
    }
}

impl Project {
    pub fn phase_actions(&self, phase: Phase, github: &GitHubSettings) -> Result<Vec<Action>> {
        Ok(match phase {
            Phase::Cleanup => self.cleanup_actions(),
            Phase::Init => self.initialize_actions(github),
            Phase::Update => self.refresh_actions(github),
            Phase::Platformify => self.customizer().customize(self)?,
            Phase::Branch => self.branch_actions(github),
            Phase::Push => self.publish_actions(github),
        })
    }

    pub fn cleanup_actions(&self) -> Vec<Action> {
        vec![Action::shell(format!("rm -rf {}", self.build_dir.display()))]
    }

    pub fn initialize_actions(&self, github: &GitHubSettings) -> Vec<Action> {
        vec![Action::shell(format!(
            "git clone {}{}/{}.git {}",
            github.clone_prefix,
            github.organization,
            self.repository_name(),
            self.build_dir.display()
        ))]
    }

    pub fn refresh_actions(&self, github: &GitHubSettings) -> Vec<Action> {
        let mut actions = vec![Action::shell(format!(
            "cd {} && git checkout {} && git pull --prune",
            self.build_dir.display(),
            github.mainline_branch
        ))];
        actions.extend(self.package_update_actions());
        actions
    }

    /// Recreate the update branch from mainline and commit whatever changed.
    /// `git commit` exits 1 when there is nothing to commit, so the
    /// `diff-index` guard turns that case into a successful no-op.
    pub fn branch_actions(&self, github: &GitHubSettings) -> Vec<Action> {
        let dir = self.build_dir.display();
        let update = &github.update_branch;
        let mainline = &github.mainline_branch;

        vec![
            Action::shell(format!(
                "cd {dir} && if git rev-parse --verify --quiet {update}; then git checkout {mainline} && git branch -D {update}; fi;"
            )),
            Action::shell(format!("cd {dir} && git checkout -b {update}")),
            Action::shell(format!(
                "cd {dir} && git add -A && git diff-index --quiet HEAD || git commit -m {}",
                shell_quote(&github.commit_message)
            )),
        ]
    }

    pub fn publish_actions(&self, github: &GitHubSettings) -> Vec<Action> {
        let update = &github.update_branch;
        vec![Action::shell(format!(
            "cd {} && if [ `git rev-parse {update}` != `git rev-parse {}` ] ; then git checkout {update} && git push --force -u origin {update}; fi",
            self.build_dir.display(),
            github.mainline_branch
        ))]
    }

    /// One guarded updater per declared manifest, in declaration order.
    pub fn package_update_actions(&self) -> Vec<Action> {
        self.update_commands
            .iter()
            .map(|update| {
                Action::shell(format!(
                    "cd {0} && [ -f {1} ] && {2} || echo \"No {1} file found, skipping.\"",
                    self.build_dir.display(),
                    update.manifest,
                    update.command
                ))
            })
            .collect()
    }
}

/// Single-quote `value` for `sh`; nothing inside is expanded.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
