//! Commands and the Julia runtime installation.
//!
//! [`CommandSpec`] is the explicit, ordered token list every stage builds.
//! [`RuntimeInstall`] knows where an installed Julia keeps its embedding
//! helper and its shared libraries.

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;

use crate::core::platform::OsFamily;
use crate::error::{JuliacError, Result};
use crate::util::process::CommandRunner;

/// A command to execute, with program, arguments, environment and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run (e.g., "julia", "cc")
    pub program: PathBuf,
    /// Command arguments, in order
    pub args: Vec<String>,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
    /// Working directory for the child
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// The full command line, quoted for reading (not for a shell).
    pub fn display(&self) -> String {
        let mut parts = vec![quote(&self.program.display().to_string())];
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&CommandSpec::display(self))
    }
}

fn quote(token: &str) -> String {
    if !token.is_empty() && !token.contains(|c: char| c.is_whitespace() || c == '\'') {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "'\\''"))
    }
}

/// An installed Julia runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInstall {
    /// The `julia` binary
    pub julia: PathBuf,
    /// The runtime's `Sys.BINDIR`
    pub bindir: PathBuf,
    pub version: Version,
}

impl RuntimeInstall {
    pub fn new(julia: impl Into<PathBuf>, bindir: impl Into<PathBuf>, version: Version) -> Self {
        RuntimeInstall {
            julia: julia.into(),
            bindir: bindir.into(),
            version,
        }
    }

    /// Ask the runtime for its version and its own `Sys.BINDIR`.
    ///
    /// The binary found on `PATH` may be a launcher living outside the
    /// installation, so the layout is taken from what the runtime reports.
    pub fn detect(julia: &Path, runner: &mut dyn CommandRunner) -> Result<Self> {
        let spec = CommandSpec::new(julia)
            .arg("--startup-file=no")
            .arg("-e")
            .arg(RUNTIME_QUERY);
        tracing::debug!("{}", spec);

        let output = runner.run(&spec).map_err(|e| {
            JuliacError::toolchain("julia", format!("failed to run `{}`: {}", spec, e))
        })?;
        if !output.is_success() {
            return Err(JuliacError::toolchain(
                "julia",
                format!("`{}` failed: {}", spec, output.stderr.trim()),
            ));
        }

        let (version, bindir) = parse_runtime_query(&output.stdout).ok_or_else(|| {
            JuliacError::toolchain(
                "julia",
                format!("unrecognized runtime query output: {}", output.stdout.trim()),
            )
        })?;

        tracing::debug!("julia {} with BINDIR {}", version, bindir.display());

        Ok(RuntimeInstall {
            julia: julia.to_path_buf(),
            bindir,
            version,
        })
    }

    fn prefix(&self) -> PathBuf {
        self.bindir.join("..")
    }

    /// The embedding helper, `share/julia/julia-config.jl`.
    pub fn config_script(&self) -> PathBuf {
        self.prefix().join("share").join("julia").join("julia-config.jl")
    }

    /// Public shared-library directory (`libjulia` lives here).
    pub fn public_lib_dir(&self, os: OsFamily) -> PathBuf {
        match os {
            OsFamily::Windows => self.bindir.clone(),
            OsFamily::Apple | OsFamily::Unix => self.prefix().join("lib"),
        }
    }

    /// Private shared-library directory (`lib/julia`).
    pub fn private_lib_dir(&self) -> PathBuf {
        self.prefix().join("lib").join("julia")
    }

    /// Both library directories, public first.
    pub fn lib_dirs(&self, os: OsFamily) -> Vec<PathBuf> {
        vec![self.public_lib_dir(os), self.private_lib_dir()]
    }

    /// Scratch subdirectory name, unique per runtime version.
    pub fn scratch_dir_name(&self) -> String {
        format!("tmp_v{}", self.version)
    }
}

/// Expression printing the runtime version and `Sys.BINDIR` on two lines.
pub const RUNTIME_QUERY: &str = r#"print(VERSION, "\n", Sys.BINDIR)"#;

/// Split the output of [`RUNTIME_QUERY`] into a version and a bin directory.
pub fn parse_runtime_query(output: &str) -> Option<(Version, PathBuf)> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    let version = parse_version(lines.next()?)?;
    let bindir = PathBuf::from(lines.next()?);
    Some((version, bindir))
}

/// Parse `julia version 1.10.2` (or a bare version) into a semver version.
pub fn parse_version(output: &str) -> Option<Version> {
    let token = output.split_whitespace().last()?;
    Version::parse(token.trim_start_matches('v')).ok()
}
