use crate::agents::{
    CommandRunnerAgent, HttpProbe, PullRequestAgent, PullRequestOutcome, StatusPollerAgent,
    TemplateScannerAgent, TestReport, build_smoke_tests, run_tests,
};
use crate::config::UpdaterConfig;
use crate::error::Result;
use crate::github::{self, GitHubClient};
use crate::project::{Phase, Project};
use colored::Colorize;

/// List the projects found in the templates directory
pub fn execute_list(config: &UpdaterConfig) -> Result<()> {
    println!(
        "{}",
        format!("Template projects in {}", config.templates_dir.display())
            .cyan()
            .bold()
    );

    let scanner = TemplateScannerAgent::new(&config.templates_dir)?;
    let names = scanner.project_names()?;
    if names.is_empty() {
        println!("\n{}", "No template projects found".yellow());
        return Ok(());
    }

    println!();
    for name in &names {
        let info = scanner.inspect(name)?;
        let cloned = if info.is_cloned {
            "cloned".green()
        } else {
            "not cloned".dimmed()
        };
        println!(
            "  • {} → {}/{} ({}, {} patch(es){}{})",
            info.name.white().bold(),
            config.github.organization.dimmed(),
            info.repository.bright_cyan(),
            cloned,
            info.patch_count,
            if info.has_overlay { ", files/" } else { "" },
            if info.has_manifest { ", project.toml" } else { "" },
        );
    }

    println!("\n{}", format!("{} project(s)", names.len()).yellow());
    Ok(())
}

/// Print the commands a phase would run without executing them
pub fn execute_show_actions(config: &UpdaterConfig, project_name: &str, phase: Phase) -> Result<()> {
    let project = Project::load(&config.templates_dir, project_name)?;
    let actions = project.phase_actions(phase, &config.github)?;

    println!(
        "{}",
        format!("{} actions for {}:", phase, project.name()).cyan().bold()
    );
    for action in &actions {
        match action.as_shell() {
            Some(command) => println!("  {}", command),
            None => println!("  {}", action.to_string().dimmed()),
        }
    }
    Ok(())
}

/// Run the generated commands of one phase
pub fn execute_phase(config: &UpdaterConfig, project_name: &str, phase: Phase) -> Result<()> {
    let project = Project::load(&config.templates_dir, project_name)?;
    run_phase(config, &project, phase, None)
}

fn run_phase(
    config: &UpdaterConfig,
    project: &Project,
    phase: Phase,
    step: Option<usize>,
) -> Result<()> {
    println!(
        "\n{}",
        heading(step, &format!("Running {phase} for {}...", project.name())).yellow()
    );

    let actions = project.phase_actions(phase, &config.github)?;
    CommandRunnerAgent::new().run_all(&actions)?;

    println!("{}", format!("✓ {phase} completed").green());
    Ok(())
}

/// Open the update pull request
pub fn execute_pull_request(
    config: &UpdaterConfig,
    project_name: &str,
    token: Option<String>,
) -> Result<()> {
    let project = Project::load(&config.templates_dir, project_name)?;
    let client = GitHubClient::new(&config.github, github::resolve_token(token))?;
    open_pull_request(config, &project, &client, None).map(|_| ())
}

fn open_pull_request(
    config: &UpdaterConfig,
    project: &Project,
    client: &GitHubClient,
    step: Option<usize>,
) -> Result<PullRequestOutcome> {
    let repository = project.repository_name();
    let title = format!(
        "Opening pull request {} → {} on {}/{}...",
        config.github.update_branch,
        config.github.mainline_branch,
        config.github.organization,
        repository
    );
    println!("\n{}", heading(step, &title).yellow());

    let outcome = PullRequestAgent::new(client, repository).open_pull_request(&config.github)?;
    match outcome {
        PullRequestOutcome::Created => println!("{}", "✓ Pull request created".green()),
        PullRequestOutcome::AlreadyOpen => {
            println!("{}", "✓ Pull request already open".green())
        }
        PullRequestOutcome::NoChanges => println!(
            "{}",
            format!(
                "✓ No changes: {} is identical to {}, nothing to open",
                config.github.update_branch, config.github.mainline_branch
            )
            .green()
        ),
    }
    Ok(outcome)
}

/// Wait for preview deployments and smoke test them. Returns the verdict.
pub fn execute_test(config: &UpdaterConfig, project_name: &str, token: Option<String>) -> Result<bool> {
    let project = Project::load(&config.templates_dir, project_name)?;
    let client = GitHubClient::new(&config.github, github::resolve_token(token))?;
    let report = test_project(config, &project, &client, None)?;
    Ok(report.verdict(config.testing.on_no_targets))
}

fn test_project(
    config: &UpdaterConfig,
    project: &Project,
    client: &GitHubClient,
    step: Option<usize>,
) -> Result<TestReport> {
    let repository = project.repository_name();
    let title = format!("Waiting for preview deployments of {}...", repository);
    println!("\n{}", heading(step, &title).yellow());

    let mut poller = StatusPollerAgent::new(client, config.polling.policy()?);
    // Per-attempt log lines would tear through the bar.
    if tracing::enabled!(tracing::Level::INFO) {
        poller = poller.without_progress();
    }
    let targets = poller.resolve_target_urls(&repository)?;
    if targets.is_empty() {
        println!("{}", format!("No open pull requests to test for {}", project.name()).yellow());
    }

    let probe = HttpProbe::new(config.testing.request_timeout()?)?;
    let tests = build_smoke_tests(&probe, &project.manifest().smoke_tests)?;
    println!(
        "\n{}",
        format!("Running {} test(s) against {} URL(s)...", tests.len(), targets.len()).yellow()
    );

    let report = run_tests(&targets, &tests)?;
    print_test_report(&report);

    let verdict = report.verdict(config.testing.on_no_targets);
    if verdict {
        println!("{}", "✓ Tests passed".green().bold());
    } else if report.targets == 0 {
        println!(
            "{}",
            "✗ Nothing was tested; refusing to treat this as a pass (testing.on_no_targets = \"block\")"
                .red()
                .bold()
        );
    } else {
        println!("{}", "✗ Tests failed".red().bold());
    }
    Ok(report)
}

fn print_test_report(report: &TestReport) {
    if report.results.is_empty() {
        return;
    }

    println!("\n{}", "Test Summary:".cyan().bold());
    for result in &report.results {
        let mark = if result.passed { "✓".green() } else { "✗".red() };
        println!("  {} {} {}", mark, result.test.white(), result.url.dimmed());
    }

    let failed = report.failures().count();
    if failed > 0 {
        println!("{}", format!("{} of {} check(s) failed", failed, report.results.len()).red());
    }
}

/// Merge the most recent pull request
pub fn execute_merge(config: &UpdaterConfig, project_name: &str, token: Option<String>) -> Result<()> {
    let project = Project::load(&config.templates_dir, project_name)?;
    let client = GitHubClient::new(&config.github, github::resolve_token(token))?;
    merge_pull_request(&project, &client, None)
}

fn merge_pull_request(project: &Project, client: &GitHubClient, step: Option<usize>) -> Result<()> {
    let repository = project.repository_name();
    let title = format!("Merging latest pull request of {}...", repository);
    println!("\n{}", heading(step, &title).yellow());

    let outcome = PullRequestAgent::new(client, repository).merge_latest_pull_request()?;
    println!(
        "{}",
        format!(
            "✓ #{} ({} → {}) merged: {}",
            outcome.pull.number, outcome.pull.head.name, outcome.pull.base.name, outcome.message
        )
        .green()
    );
    println!("   {}", outcome.pull.link().dimmed());
    Ok(())
}

/// Execute the full update chain for one project. Returns whether the
/// update was merged (or would have been, with `skip_merge`).
pub fn execute_run(
    config: &UpdaterConfig,
    project_name: &str,
    token: Option<String>,
    fresh: bool,
    skip_merge: bool,
) -> Result<bool> {
    let project = Project::load(&config.templates_dir, project_name)?;
    println!(
        "{}",
        format!("Starting template update for {}...", project.name())
            .cyan()
            .bold()
    );

    let client = GitHubClient::new(&config.github, github::resolve_token(token))?;

    let mut phases = Vec::new();
    if fresh || !project.build_dir().join(".git").is_dir() {
        phases.extend([Phase::Cleanup, Phase::Init]);
    }
    phases.extend([Phase::Update, Phase::Platformify, Phase::Branch, Phase::Push]);

    let mut step = 0;
    for phase in phases {
        step += 1;
        run_phase(config, &project, phase, Some(step))?;
    }

    step += 1;
    if open_pull_request(config, &project, &client, Some(step))? == PullRequestOutcome::NoChanges {
        println!(
            "\n{}",
            format!("✨ {} is already up to date", project.name()).green().bold()
        );
        return Ok(true);
    }

    step += 1;
    let report = test_project(config, &project, &client, Some(step))?;
    if !report.verdict(config.testing.on_no_targets) {
        if report.targets == 0 {
            println!(
                "\n{}",
                format!(
                    "No open pull request was found for {}; nothing to review or merge.",
                    project.repository_name()
                )
                .yellow()
            );
        } else {
            println!("\n{}", "Update left open for review.".yellow());
        }
        return Ok(false);
    }

    if skip_merge {
        println!("\n{}", "Skipping merge as requested".yellow());
    } else {
        merge_pull_request(&project, &client, Some(step + 1))?;
    }

    println!(
        "\n{}",
        "✨ Template update completed successfully!".green().bold()
    );
    Ok(true)
}

fn heading(step: Option<usize>, title: &str) -> String {
    match step {
        Some(step) => format!("{step}. {title}"),
        None => title.to_string(),
    }
}
