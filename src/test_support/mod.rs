//! Test utilities and mocks for juliac unit tests.
//!
//! [`MockExecutor`] stands in for the toolchain: it answers commands from
//! scripted expectations and records every command it was asked to run.
//!
//! # Example
//!
//! ```rust,ignore
//! use juliac::test_support::MockExecutor;
//! use juliac::util::process::ProcessOutput;
//!
//! let mut exec = MockExecutor::new();
//! exec.expect("julia --version", ProcessOutput::success("julia version 1.10.2"));
//! ```

pub mod fixtures;

use std::io;

use crate::builder::toolchain::CommandSpec;
use crate::util::process::{CommandRunner, ProcessOutput};

pub use fixtures::*;

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    pub pattern: CommandPattern,
    pub output: ProcessOutput,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    pub used: usize,
}

impl CommandExpectation {
    pub fn new(pattern: CommandPattern, output: ProcessOutput) -> Self {
        CommandExpectation {
            pattern,
            output,
            times: None,
            used: 0,
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

/// Mock process executor.
///
/// Commands are matched against expectations in insertion order. A command
/// with no matching expectation and no default fails to spawn.
#[derive(Debug, Default)]
pub struct MockExecutor {
    expectations: Vec<CommandExpectation>,
    calls: Vec<String>,
    default_output: Option<ProcessOutput>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&mut self, cmd: &str, output: ProcessOutput) -> &mut Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&mut self, prefix: &str, output: ProcessOutput) -> &mut Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::StartsWith(prefix.to_string()),
            output,
        ))
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(&mut self, substring: &str, output: ProcessOutput) -> &mut Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Contains(substring.to_string()),
            output,
        ))
    }

    pub fn expect_pattern(&mut self, expectation: CommandExpectation) -> &mut Self {
        self.expectations.push(expectation);
        self
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&mut self, output: ProcessOutput) -> &mut Self {
        self.default_output = Some(output);
        self
    }

    /// Display strings of every command run, in order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Number of recorded calls containing `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.calls.iter().filter(|c| c.contains(needle)).count()
    }

    /// Verify that all expectations with a specific count were satisfied.
    pub fn verify(&self) -> Result<(), String> {
        for (i, exp) in self.expectations.iter().enumerate() {
            if let Some(expected) = exp.times {
                if exp.used != expected {
                    return Err(format!(
                        "expectation {} was used {} times, expected {}",
                        i, exp.used, expected
                    ));
                }
            }
        }
        Ok(())
    }
}

impl CommandRunner for MockExecutor {
    fn run(&mut self, spec: &CommandSpec) -> io::Result<ProcessOutput> {
        let full_cmd = spec.display();
        self.calls.push(full_cmd.clone());

        for exp in &mut self.expectations {
            if exp.available() && exp.pattern.matches(&full_cmd) {
                exp.used += 1;
                return Ok(exp.output.clone());
            }
        }

        if let Some(ref default) = self.default_output {
            return Ok(default.clone());
        }

        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("unexpected command: {}", full_cmd),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_executor_exact() {
        let mut exec = MockExecutor::new();
        exec.expect("cc --version", ProcessOutput::success("cc 13.2.0"));

        let out = exec
            .run(&CommandSpec::new("cc").arg("--version"))
            .unwrap();
        assert!(out.is_success());
        assert_eq!(out.stdout, "cc 13.2.0");
        assert_eq!(exec.calls(), ["cc --version"]);
    }

    #[test]
    fn test_mock_executor_limited_times() {
        let mut exec = MockExecutor::new();
        exec.expect_pattern(
            CommandExpectation::new(
                CommandPattern::StartsWith("julia".into()),
                ProcessOutput::success(""),
            )
            .times(1),
        );

        let spec = CommandSpec::new("julia").arg("-e").arg("1");
        assert!(exec.run(&spec).is_ok());
        assert!(exec.run(&spec).is_err());
        assert!(exec.verify().is_ok());
    }

    #[test]
    fn test_mock_executor_default_and_regex() {
        let mut exec = MockExecutor::new();
        exec.expect_pattern(CommandExpectation::new(
            CommandPattern::Regex(r"--output-o \S+\.o".into()),
            ProcessOutput::failure(1, "boom"),
        ));
        exec.set_default(ProcessOutput::success("ok"));

        let failing = CommandSpec::new("julia").args(["--output-o", "a.o"]);
        assert_eq!(exec.run(&failing).unwrap().status, Some(1));
        assert_eq!(
            exec.run(&CommandSpec::new("cc")).unwrap().stdout,
            "ok"
        );
        assert_eq!(exec.count_containing("julia"), 1);
    }
}
