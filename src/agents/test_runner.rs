use super::smoke_tests::SmokeTest;
use super::status_poller::TargetUrl;
use crate::config::NoTargetsPolicy;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub test: String,
    pub url: String,
    pub passed: bool,
}

/// Outcome of running every smoke test against every preview URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    pub targets: usize,
    pub results: Vec<TestResult>,
}

impl TestReport {
    /// True when no result failed; vacuously true for an empty run.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Whether the report allows merging under the given policy.
    pub fn verdict(&self, on_no_targets: NoTargetsPolicy) -> bool {
        if self.targets == 0 {
            return on_no_targets == NoTargetsPolicy::Pass;
        }
        self.all_passed()
    }
}

/// Runs each test against each URL, tests in the outer loop. A test that
/// cannot complete aborts the run.
pub fn run_tests(targets: &[TargetUrl], tests: &[Box<dyn SmokeTest>]) -> Result<TestReport> {
    let mut report = TestReport {
        targets: targets.len(),
        results: Vec::with_capacity(targets.len() * tests.len()),
    };

    for test in tests {
        for target in targets {
            let passed = test.check(&target.url)?;
            tracing::debug!(test = %test.name(), url = %target.url, passed, "smoke test finished");
            report.results.push(TestResult {
                test: test.name(),
                url: target.url.clone(),
                passed,
            });
        }
    }

    Ok(report)
}
