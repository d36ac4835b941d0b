mod agents;
mod cli;
mod config;
mod error;
mod github;
mod project;
mod utils;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use config::UpdaterConfig;
use error::Result;
use project::Phase;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Dispatch the command. `Ok(false)` means the workflow finished but the
/// update must not go ahead (failed or missing tests).
fn run(cli: Cli) -> Result<bool> {
    let mut config = UpdaterConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.templates_dir {
        config.templates_dir = dir;
    }

    let phase = |project: String, phase: Phase| {
        workflow::execute_phase(&config, &project, phase).map(|()| true)
    };

    match cli.command {
        Commands::List => workflow::execute_list(&config).map(|()| true),
        Commands::Cleanup(args) => phase(args.project, Phase::Cleanup),
        Commands::Init(args) => phase(args.project, Phase::Init),
        Commands::Update(args) => phase(args.project, Phase::Update),
        Commands::Platformify(args) => phase(args.project, Phase::Platformify),
        Commands::Branch(args) => phase(args.project, Phase::Branch),
        Commands::Push(args) => phase(args.project, Phase::Push),
        Commands::PullRequest(args) => {
            workflow::execute_pull_request(&config, &args.project, args.token).map(|()| true)
        }
        Commands::Test(args) => workflow::execute_test(&config, &args.project, args.token),
        Commands::Merge(args) => {
            workflow::execute_merge(&config, &args.project, args.token).map(|()| true)
        }
        Commands::Run {
            hosted,
            fresh,
            skip_merge,
        } => workflow::execute_run(&config, &hosted.project, hosted.token, fresh, skip_merge),
        Commands::Actions { project, phase } => {
            workflow::execute_show_actions(&config, &project, phase).map(|()| true)
        }
    }
}
