//! Implementation of `juliac build`.

use std::path::PathBuf;
use std::time::Instant;

use crate::builder::flags::{FlagProvider, JuliaConfig, PlatformFlags};
use crate::builder::stage::{StageKind, StageResult};
use crate::builder::toolchain::{CommandSpec, RuntimeInstall};
use crate::builder::Pipeline;
use crate::core::config::{resolve, BuildConfig, BuildRequest, DriverProgram};
use crate::core::platform::Platform;
use crate::error::Result;
use crate::ops::sync_libs::{sync_libraries, SyncReport};
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::process::CommandRunner;
use crate::util::shell::{format_duration, Shell, Status};

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Print the commands instead of running stages
    pub dry_run: bool,

    /// Platform the artifacts are built for
    pub platform: Platform,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            dry_run: false,
            platform: Platform::host(),
        }
    }
}

/// Build result.
#[derive(Debug)]
pub struct BuildOutcome {
    pub config: BuildConfig,

    /// The runtime the build used; `None` when nothing was enabled
    pub runtime: Option<RuntimeInstall>,

    /// Artifacts produced, in stage order
    pub stages: Vec<StageResult>,

    /// Library sync outcome, when the sync ran
    pub synced: Option<SyncReport>,

    /// Commands a dry run would execute
    pub planned: Vec<(StageKind, CommandSpec)>,

    /// Library directories a dry run would sync from
    pub planned_sync: Vec<PathBuf>,
}

impl BuildOutcome {
    fn new(config: BuildConfig) -> Self {
        BuildOutcome {
            config,
            runtime: None,
            stages: Vec::new(),
            synced: None,
            planned: Vec::new(),
            planned_sync: Vec::new(),
        }
    }
}

/// Build a Julia program into native artifacts.
pub fn build(
    request: &BuildRequest,
    opts: &BuildOptions,
    shell: &Shell,
    runner: &mut dyn CommandRunner,
) -> Result<BuildOutcome> {
    build_with(request, opts, shell, runner, &JuliaConfig)
}

/// [`build`] with an explicit platform-flag source.
pub fn build_with(
    request: &BuildRequest,
    opts: &BuildOptions,
    shell: &Shell,
    runner: &mut dyn CommandRunner,
    provider: &dyn FlagProvider,
) -> Result<BuildOutcome> {
    let start = Instant::now();
    let config = resolve(request, opts.platform)?;
    let mut outcome = BuildOutcome::new(config);
    let config = &outcome.config;

    if config.stages.is_empty() {
        if !opts.dry_run {
            prepare_build_dir(config, shell)?;
        }
        shell.warn("no stages enabled, nothing to do");
        return Ok(outcome);
    }

    if shell.is_verbose() {
        shell.note(format!("Julia program: {}", config.program.display()));
        if config.stages.executable {
            let driver = match config.driver {
                DriverProgram::Bundled => "bundled driver".to_string(),
                DriverProgram::Path(ref path) => path.display().to_string(),
            };
            shell.note(format!("C driver: {}", driver));
        }
        shell.note(format!("Build directory: {}", config.build_dir.display()));
    }

    let runtime = RuntimeInstall::detect(&config.tools.julia, runner)?;
    tracing::info!("using julia {} from {}", runtime.version, runtime.bindir.display());

    if opts.dry_run {
        let flags = if config.stages.needs_linking() {
            provider.platform_flags(runner, &runtime)?
        } else {
            PlatformFlags::default()
        };
        let planned = Pipeline::new(config, &runtime, shell).plan(&flags)?;
        let planned_sync = if config.stages.sync_libraries {
            runtime.lib_dirs(config.platform.os)
        } else {
            Vec::new()
        };
        outcome.planned = planned;
        outcome.planned_sync = planned_sync;
        outcome.runtime = Some(runtime);
        return Ok(outcome);
    }

    prepare_build_dir(config, shell)?;

    let mut pipeline = Pipeline::new(config, &runtime, shell);
    let stages = pipeline.run(runner, provider)?;
    for result in &stages {
        shell.status(Status::Created, result.artifact.display());
    }

    let synced = if config.stages.sync_libraries {
        let report = sync_libraries(
            &runtime.lib_dirs(config.platform.os),
            &config.build_dir,
            config.platform.os,
            shell,
        )?;
        shell.note(format!(
            "{} librar{} copied, {} up to date",
            report.copied.len(),
            if report.copied.len() == 1 { "y" } else { "ies" },
            report.up_to_date
        ));
        Some(report)
    } else {
        None
    };

    shell.status(
        Status::Finished,
        format!(
            "`{}` in {}",
            config.basename,
            format_duration(start.elapsed())
        ),
    );

    outcome.stages = stages;
    outcome.synced = synced;
    outcome.runtime = Some(runtime);
    Ok(outcome)
}

/// Remove the build directory when cleaning, then make sure it exists.
fn prepare_build_dir(config: &BuildConfig, shell: &Shell) -> Result<()> {
    if config.clean && config.build_dir.exists() {
        remove_dir_all_if_exists(&config.build_dir)?;
        shell.status(Status::Removed, config.build_dir.display());
    }
    ensure_dir(&config.build_dir)
}
