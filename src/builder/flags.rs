//! Platform compile/link flags from the runtime's embedding helper.
//!
//! Julia ships `share/julia/julia-config.jl`, which prints shell-quoted flag
//! strings for `--cflags`, `--ldflags` and `--ldlibs`. The pipeline asks for
//! them once per run and only when a link stage is enabled.

use crate::builder::toolchain::{CommandSpec, RuntimeInstall};
use crate::error::{JuliacError, Result};
use crate::util::process::CommandRunner;

/// Compile flags, link flags and link libraries, already tokenized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformFlags {
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub ldlibs: Vec<String>,
}

impl PlatformFlags {
    /// All three groups in the order a link line wants them.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.cflags
            .iter()
            .chain(self.ldflags.iter())
            .chain(self.ldlibs.iter())
    }
}

/// Source of platform flags for the link stages.
pub trait FlagProvider {
    fn platform_flags(
        &self,
        runner: &mut dyn CommandRunner,
        runtime: &RuntimeInstall,
    ) -> Result<PlatformFlags>;
}

/// Queries `julia-config.jl` from the runtime installation.
#[derive(Debug, Default, Clone, Copy)]
pub struct JuliaConfig;

impl JuliaConfig {
    fn query(
        runner: &mut dyn CommandRunner,
        runtime: &RuntimeInstall,
        option: &str,
    ) -> Result<Vec<String>> {
        let spec = CommandSpec::new(&runtime.julia)
            .arg("--startup-file=no")
            .arg(runtime.config_script().display().to_string())
            .arg(option);

        tracing::debug!("{}", spec);
        let output = runner.run(&spec).map_err(|e| {
            JuliacError::toolchain("julia-config", format!("failed to run `{}`: {}", spec, e))
        })?;
        if !output.is_success() {
            return Err(JuliacError::toolchain(
                "julia-config",
                format!("`{}` failed: {}", spec, output.stderr.trim()),
            ));
        }

        shell_split(output.stdout.trim()).ok_or_else(|| {
            JuliacError::toolchain(
                "julia-config",
                format!("unbalanced quotes in {} output: {}", option, output.stdout.trim()),
            )
        })
    }
}

impl FlagProvider for JuliaConfig {
    fn platform_flags(
        &self,
        runner: &mut dyn CommandRunner,
        runtime: &RuntimeInstall,
    ) -> Result<PlatformFlags> {
        let script = runtime.config_script();
        if !script.is_file() {
            return Err(JuliacError::toolchain(
                "julia-config",
                format!("embedding helper not found at {}", script.display()),
            ));
        }

        let flags = PlatformFlags {
            cflags: Self::query(runner, runtime, "--cflags")?,
            ldflags: Self::query(runner, runtime, "--ldflags")?,
            ldlibs: Self::query(runner, runtime, "--ldlibs")?,
        };
        tracing::debug!("platform flags: {:?}", flags);
        Ok(flags)
    }
}

/// Fixed flags, for tests and for callers that already know them.
#[derive(Debug, Clone, Default)]
pub struct StaticFlags(pub PlatformFlags);

impl FlagProvider for StaticFlags {
    fn platform_flags(
        &self,
        _runner: &mut dyn CommandRunner,
        _runtime: &RuntimeInstall,
    ) -> Result<PlatformFlags> {
        Ok(self.0.clone())
    }
}

/// Split a POSIX-shell-quoted string into words.
///
/// Handles single quotes, double quotes (with `\` escapes) and bare
/// backslash escapes. Returns `None` on an unterminated quote.
pub fn shell_split(input: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        ch => current.push(ch),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => match chars.next()? {
                            ch @ ('"' | '\\' | '$' | '`') => current.push(ch),
                            '\n' => {}
                            ch => {
                                current.push('\\');
                                current.push(ch);
                            }
                        },
                        ch => current.push(ch),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some('\n') | None => {}
                    Some(ch) => current.push(ch),
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Some(words)
}
