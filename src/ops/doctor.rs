//! Environment and toolchain health checks.
//!
//! The `doctor` command verifies that the tools `juliac build` needs are
//! present and usable.
//!
//! ## Usage
//!
//! ```bash
//! juliac doctor           # Quick check
//! juliac doctor --verbose # Detailed output
//! ```
//!
//! ## Checks Performed
//!
//! - Julia runtime (version and `Sys.BINDIR`)
//! - Embedding helper (`share/julia/julia-config.jl`)
//! - Runtime shared libraries
//! - C compiler availability (cc, gcc, clang)
//! - Auxiliary MinGW toolchain (Windows, optional)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::builder::toolchain::{CommandSpec, RuntimeInstall};
use crate::core::config::{default_c_compilers, ToolchainSettings};
use crate::core::platform::{OsFamily, Platform};
use crate::ops::sync_libs::find_candidates;
use crate::util::process::CommandRunner;

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,

    /// Whether the check passed
    pub passed: bool,

    /// Human-readable status message
    pub message: String,

    /// Path to the tool (if applicable)
    pub path: Option<PathBuf>,

    /// Version string (if applicable)
    pub version: Option<String>,

    /// How long the check took
    pub duration: Duration,

    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            version: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Create a failing check result.
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            passed: false,
            ..CheckResult::pass(name, message)
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,

    /// Total time taken
    pub total_duration: Duration,

    /// Environment information
    pub environment: HashMap<String, String>,
}

impl DoctorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }
}

/// Options for the doctor command.
#[derive(Debug, Clone)]
pub struct DoctorOptions {
    /// Tool locations from config files
    pub toolchain: ToolchainSettings,

    pub platform: Platform,
}

impl Default for DoctorOptions {
    fn default() -> Self {
        DoctorOptions {
            toolchain: ToolchainSettings::default(),
            platform: Platform::host(),
        }
    }
}

/// Run the doctor command.
pub fn doctor(options: &DoctorOptions, runner: &mut dyn CommandRunner) -> DoctorReport {
    let start = Instant::now();
    let mut report = DoctorReport::new();
    let os = options.platform.os;

    report
        .environment
        .insert("os".to_string(), std::env::consts::OS.to_string());
    report
        .environment
        .insert("arch".to_string(), std::env::consts::ARCH.to_string());

    let (julia_check, runtime) = check_julia(options.toolchain.julia.as_deref(), runner);
    report.add(julia_check);

    match runtime {
        Some(ref runtime) => {
            report.add(check_config_script(runtime));
            report.add(check_runtime_libraries(runtime, os));
        }
        None => {
            report.add(CheckResult::fail(
                "Embedding helper",
                "Skipped: no usable Julia runtime",
            ));
            report.add(CheckResult::fail(
                "Runtime libraries",
                "Skipped: no usable Julia runtime",
            ));
        }
    }

    report.add(check_c_compiler(options.toolchain.cc.as_deref(), os, runner));

    if os == OsFamily::Windows {
        report.add(check_mingw(options.toolchain.mingw_root.as_deref()));
    }

    report.total_duration = start.elapsed();
    report
}

/// Locate Julia and ask it for its version and bin directory.
fn check_julia(
    explicit: Option<&Path>,
    runner: &mut dyn CommandRunner,
) -> (CheckResult, Option<RuntimeInstall>) {
    let start = Instant::now();

    let candidate = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("JULIA").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("julia"));

    let Ok(path) = which::which(&candidate) else {
        return (
            CheckResult::fail(
                "Julia",
                format!(
                    "`{}` not found; install Julia or set JULIA",
                    candidate.display()
                ),
            )
            .with_duration(start.elapsed()),
            None,
        );
    };

    match RuntimeInstall::detect(&path, runner) {
        Ok(runtime) => (
            CheckResult::pass("Julia", format!("Found julia {}", runtime.version))
                .with_path(path)
                .with_version(runtime.version.to_string())
                .with_duration(start.elapsed()),
            Some(runtime),
        ),
        Err(e) => (
            CheckResult::fail("Julia", e.to_string())
                .with_path(path)
                .with_duration(start.elapsed()),
            None,
        ),
    }
}

fn check_config_script(runtime: &RuntimeInstall) -> CheckResult {
    let script = runtime.config_script();
    if script.is_file() {
        CheckResult::pass("Embedding helper", "julia-config.jl is present").with_path(script)
    } else {
        CheckResult::fail(
            "Embedding helper",
            format!("julia-config.jl not found at {}", script.display()),
        )
    }
}

fn check_runtime_libraries(runtime: &RuntimeInstall, os: OsFamily) -> CheckResult {
    let dirs = runtime.lib_dirs(os);
    match find_candidates(&dirs, os) {
        Ok(found) if !found.is_empty() => CheckResult::pass(
            "Runtime libraries",
            format!("{} shared libraries to bundle", found.len()),
        )
        .with_path(runtime.public_lib_dir(os)),
        Ok(_) => CheckResult::fail(
            "Runtime libraries",
            format!(
                "no shared libraries in {}",
                dirs.iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" or ")
            ),
        ),
        Err(e) => CheckResult::fail("Runtime libraries", e.to_string()),
    }
}

/// Check for a C compiler.
fn check_c_compiler(
    explicit: Option<&Path>,
    os: OsFamily,
    runner: &mut dyn CommandRunner,
) -> CheckResult {
    let start = Instant::now();

    let mut compilers: Vec<PathBuf> = Vec::new();
    if let Some(path) = explicit {
        compilers.push(path.to_path_buf());
    }
    if let Some(cc) = std::env::var_os("CC").filter(|v| !v.is_empty()) {
        compilers.push(PathBuf::from(cc));
    }
    let defaults = default_c_compilers(os);
    compilers.extend(defaults.iter().map(PathBuf::from));

    for compiler in &compilers {
        if let Ok(path) = which::which(compiler) {
            let version = compiler_version(&path, runner);
            return CheckResult::pass("C Compiler", format!("Found {}", compiler.display()))
                .with_path(path)
                .with_version(version)
                .with_duration(start.elapsed());
        }
    }

    CheckResult::fail(
        "C Compiler",
        format!("No C compiler found (tried {})", defaults.join(", ")),
    )
    .with_duration(start.elapsed())
}

/// First version-looking line of `<cc> --version`.
fn compiler_version(path: &Path, runner: &mut dyn CommandRunner) -> String {
    let Ok(output) = runner.run(&CommandSpec::new(path).arg("--version")) else {
        return "unknown version".to_string();
    };

    // Some compilers print their version to stderr
    let text = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };

    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown version".to_string())
}

fn check_mingw(root: Option<&Path>) -> CheckResult {
    match root {
        None => CheckResult::pass("MinGW", "Not configured").optional(),
        Some(root) if root.join("bin").is_dir() => {
            CheckResult::pass("MinGW", "Toolchain root found")
                .with_path(root.to_path_buf())
                .optional()
        }
        Some(root) => CheckResult::fail(
            "MinGW",
            format!("{} has no bin directory", root.display()),
        )
        .with_path(root.to_path_buf())
        .optional(),
    }
}

/// Format the doctor report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    use std::fmt::Write;

    let mut output = String::new();

    let _ = writeln!(output, "juliac doctor");
    let _ = writeln!(output, "=============\n");

    if verbose {
        let unknown = "unknown".to_string();
        let _ = writeln!(output, "Environment:");
        let _ = writeln!(
            output,
            "  OS: {} ({})\n",
            report.environment.get("os").unwrap_or(&unknown),
            report.environment.get("arch").unwrap_or(&unknown)
        );
    }

    let _ = writeln!(output, "Checks:");
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };

        let _ = writeln!(output, "  {} {}{}", status, check.name, required);

        if verbose || !check.passed {
            let _ = writeln!(output, "      {}", check.message);
        }
        if verbose {
            if let Some(path) = &check.path {
                let _ = writeln!(output, "      Path: {}", path.display());
            }
            if let Some(version) = &check.version {
                let _ = writeln!(output, "      Version: {}", version);
            }
        }
    }

    let _ = writeln!(output);

    let passed = report.passed_count();
    let failed = report.failed_count();
    let required_failed = report.required_failed_count();

    let _ = writeln!(output, "Summary: {} passed, {} failed", passed, failed);

    if required_failed > 0 {
        let _ = writeln!(
            output,
            "\nWarning: {} required check(s) failed. `juliac build` will not work.",
            required_failed
        );
    } else if failed > 0 {
        let _ = writeln!(
            output,
            "\nAll required checks passed. {} optional check(s) failed.",
            failed
        );
    } else {
        let _ = writeln!(output, "\nAll checks passed. juliac is ready to use.");
    }

    output
}
