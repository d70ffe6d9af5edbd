//! Error types for the build pipeline.
//!
//! Every failure is fatal: the pipeline aborts at the first error and nothing
//! is retried. Each variant carries enough context to name the failing option,
//! file or command line.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::builder::stage::StageKind;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, JuliacError>;

/// Errors produced while resolving, building or syncing.
#[derive(Debug, Error, Diagnostic)]
pub enum JuliacError {
    /// An enumerated option got a value outside its closed set.
    #[error("invalid value `{value}` for option `{field}` (expected one of: {expected})")]
    #[diagnostic(
        code(juliac::option::invalid),
        help("Run `juliac build --help` to see the accepted values")
    )]
    InvalidOption {
        field: &'static str,
        value: String,
        expected: String,
    },

    /// A required input file does not exist.
    #[error("cannot find {what}: {}", .path.display())]
    #[diagnostic(code(juliac::input::not_found))]
    FileNotFound { what: &'static str, path: PathBuf },

    /// The runtime helper or a compiler could not be found or failed.
    #[error("toolchain error ({tool}): {message}")]
    #[diagnostic(
        code(juliac::toolchain),
        help("Run `juliac doctor` to check the Julia installation and C compiler")
    )]
    Toolchain { tool: String, message: String },

    /// A pipeline stage's child process failed.
    #[error("{stage} stage failed{}\n  command: {command}{}", status_suffix(.status), stderr_suffix(.stderr))]
    #[diagnostic(
        code(juliac::stage::failed),
        help("Re-run with --verbose to see every composed command")
    )]
    Stage {
        stage: StageKind,
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// A juliac.toml file could not be parsed.
    #[error("failed to parse config file {}", .path.display())]
    #[diagnostic(code(juliac::config))]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Directory creation, deletion or file copy failed.
    #[error("failed to {action} {}", .path.display())]
    #[diagnostic(code(juliac::fs))]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl JuliacError {
    /// Shorthand for a filesystem error.
    pub fn fs(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        JuliacError::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a toolchain error.
    pub fn toolchain(tool: impl Into<String>, message: impl Into<String>) -> Self {
        JuliacError::Toolchain {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

fn status_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" with exit code {}", code),
        None => String::new(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_names_field_and_value() {
        let err = JuliacError::InvalidOption {
            field: "optimize",
            value: "4".to_string(),
            expected: "0, 1, 2, 3".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("`optimize`"));
        assert!(msg.contains("`4`"));
        assert!(msg.contains("0, 1, 2, 3"));
    }

    #[test]
    fn test_stage_error_carries_command_line() {
        let err = JuliacError::Stage {
            stage: StageKind::Shared,
            command: "cc -m64 -shared -o hello.so hello.o".to_string(),
            status: Some(1),
            stderr: "ld: cannot find -ljulia\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("shared library stage failed with exit code 1"));
        assert!(msg.contains("command: cc -m64 -shared -o hello.so hello.o"));
        assert!(msg.ends_with("ld: cannot find -ljulia"));
    }

    #[test]
    fn test_stage_error_without_status() {
        let err = JuliacError::Stage {
            stage: StageKind::Object,
            command: "julia".to_string(),
            status: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "object stage failed\n  command: julia");
    }
}
