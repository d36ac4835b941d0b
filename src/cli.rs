use crate::project::Phase;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "template-updater",
    about = "Template Updater - keep template repositories in sync with their upstreams",
    version,
    author
)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./updater.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the template projects (overrides the config file)
    #[arg(short, long, global = true, value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Template project name (a directory under the templates directory)
    #[arg(value_name = "PROJECT")]
    pub project: String,
}

#[derive(Args, Debug)]
pub struct HostedArgs {
    /// Template project name (a directory under the templates directory)
    #[arg(value_name = "PROJECT")]
    pub project: String,

    /// GitHub API token (falls back to the GITHUB_TOKEN environment variable)
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the template projects and their local state
    List,

    /// Remove the local build checkout
    Cleanup(ProjectArgs),

    /// Clone the upstream repository into the build directory
    Init(ProjectArgs),

    /// Pull the mainline branch and update package dependencies
    #[command(alias = "refresh")]
    Update(ProjectArgs),

    /// Apply the project's files, patches and commands on top of the checkout
    #[command(alias = "customize")]
    Platformify(ProjectArgs),

    /// Commit the changes to the update branch
    Branch(ProjectArgs),

    /// Force-push the update branch
    #[command(alias = "publish")]
    Push(ProjectArgs),

    /// Open a pull request from the update branch
    PullRequest(HostedArgs),

    /// Wait for preview deployments and smoke test them
    Test(HostedArgs),

    /// Merge the most recent pull request
    Merge(HostedArgs),

    /// Run the whole update chain for a project
    Run {
        #[command(flatten)]
        hosted: HostedArgs,

        /// Start from a fresh clone even if a checkout exists
        #[arg(long)]
        fresh: bool,

        /// Stop after testing, leaving the pull request open
        #[arg(long)]
        skip_merge: bool,
    },

    /// Print the commands a phase would run, without running them
    Actions {
        /// Template project name
        #[arg(value_name = "PROJECT")]
        project: String,

        /// Phase to show
        #[arg(value_enum)]
        phase: Phase,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases_map_to_phases() {
        let cli = Cli::try_parse_from(["template-updater", "refresh", "drupal8"]).unwrap();
        assert!(matches!(cli.command, Commands::Update(ProjectArgs { project }) if project == "drupal8"));

        let cli = Cli::try_parse_from(["template-updater", "customize", "drupal8"]).unwrap();
        assert!(matches!(cli.command, Commands::Platformify(_)));

        let cli = Cli::try_parse_from(["template-updater", "publish", "drupal8"]).unwrap();
        assert!(matches!(cli.command, Commands::Push(_)));
    }

    #[test]
    fn run_accepts_token_and_flags() {
        let cli = Cli::try_parse_from([
            "template-updater",
            "--templates-dir",
            "/srv/templates",
            "run",
            "wordpress",
            "--token",
            "abc",
            "--skip-merge",
        ])
        .unwrap();

        assert_eq!(cli.templates_dir, Some(PathBuf::from("/srv/templates")));
        match cli.command {
            Commands::Run {
                hosted,
                fresh,
                skip_merge,
            } => {
                assert_eq!(hosted.project, "wordpress");
                assert_eq!(hosted.token.as_deref(), Some("abc"));
                assert!(!fresh);
                assert!(skip_merge);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn actions_takes_a_phase() {
        let cli = Cli::try_parse_from(["template-updater", "actions", "site", "platformify"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Actions { phase: Phase::Platformify, .. }
        ));
        assert!(Cli::try_parse_from(["template-updater", "actions", "site", "deploy"]).is_err());
    }
}
