pub mod command_runner;
pub mod composer_editor;
pub mod pull_requests;
pub mod smoke_tests;
pub mod status_poller;
pub mod template_scanner;
pub mod test_runner;

pub use command_runner::CommandRunnerAgent;
pub use pull_requests::{PullRequestAgent, PullRequestOutcome};
pub use smoke_tests::{HttpProbe, build_smoke_tests};
pub use status_poller::StatusPollerAgent;
pub use template_scanner::TemplateScannerAgent;
pub use test_runner::{TestReport, run_tests};
