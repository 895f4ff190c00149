//! Test doubles for the external collaborators.

use std::cell::RefCell;
use crate::cmd::{self, CommandResult, Invocation, Runner};
use crate::github::{self, SourceControl};

/// Records every invocation and answers with canned results.
///
/// Invocations whose first argument is listed in `failing` exit with code 1.
/// `helm list` answers with `list_output`.
#[derive(Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<Invocation>>,
    failing: Vec<String>,
    failing_releases: Vec<String>,
    list_output: String,
}

impl FakeRunner {
    pub fn failing_on(subcommand: &str) -> Self {
        Self {
            failing: vec![subcommand.to_string()],
            ..Default::default()
        }
    }

    pub fn with_releases(list_output: &str) -> Self {
        Self {
            list_output: list_output.to_string(),
            ..Default::default()
        }
    }

    pub fn failing_uninstall_of(mut self, release: &str) -> Self {
        self.failing_releases.push(release.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Invocations rendered as `program arg arg ..`, secrets included.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|i| {
                let mut line = vec![i.program()];
                line.extend(i.arg_values());
                line.join(" ")
            })
            .collect()
    }
}

impl Runner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandResult, cmd::Error> {
        self.calls.borrow_mut().push(invocation.clone());
        let args = invocation.arg_values();
        let subcommand = args.first().copied().unwrap_or_default();

        if self.failing.iter().any(|f| f == subcommand)
            || (subcommand == "uninstall" && args.get(1).is_some_and(|r| self.failing_releases.iter().any(|f| f == r)))
        {
            return Ok(CommandResult {
                result_code: 1,
                output: format!("Error: {} failed", subcommand),
            });
        }

        let output = if subcommand == "list" {
            self.list_output.clone()
        } else {
            String::new()
        };
        Ok(CommandResult { result_code: 0, output })
    }
}

pub struct FakeSourceControl {
    pub pull_request_id: u64,
    pub sha7: String,
    pub run_number: u64,
}

impl Default for FakeSourceControl {
    fn default() -> Self {
        Self {
            pull_request_id: 42,
            sha7: "a1b2c3d".to_string(),
            run_number: 17,
        }
    }
}

impl SourceControl for FakeSourceControl {
    async fn pull_request_id(&self) -> Result<u64, github::Error> {
        Ok(self.pull_request_id)
    }

    async fn latest_commit_short_sha(&self) -> Result<String, github::Error> {
        Ok(self.sha7.clone())
    }

    fn run_number(&self) -> Result<u64, github::Error> {
        Ok(self.run_number)
    }
}
