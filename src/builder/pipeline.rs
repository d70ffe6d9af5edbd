//! The three-stage native build: object, shared library, executable.
//!
//! Stages run strictly in that order. Each one builds an explicit
//! [`CommandSpec`] from the resolved [`BuildConfig`], runs it to completion,
//! and stops the pipeline on the first failure.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::builder::flags::{FlagProvider, PlatformFlags};
use crate::builder::link::{self, AuxToolchain, LinkAdjustments};
use crate::builder::stage::{PipelineState, StageKind, StageResult};
use crate::builder::toolchain::{CommandSpec, RuntimeInstall};
use crate::core::config::{BuildConfig, DriverProgram};
use crate::error::{JuliacError, Result};
use crate::util::process::CommandRunner;
use crate::util::shell::Shell;

/// Source of the driver used when the caller does not supply one.
pub const BUNDLED_DRIVER: &str = include_str!("../../resources/program.c");

/// File name the bundled driver is written to, inside the scratch directory.
pub const BUNDLED_DRIVER_NAME: &str = "program.c";

/// Runs the enabled stages for one build.
pub struct Pipeline<'a> {
    config: &'a BuildConfig,
    runtime: &'a RuntimeInstall,
    shell: &'a Shell,
    state: PipelineState,
    flags: Option<PlatformFlags>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a BuildConfig, runtime: &'a RuntimeInstall, shell: &'a Shell) -> Self {
        Pipeline {
            config,
            runtime,
            shell,
            state: PipelineState::NotStarted,
            flags: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Per-runtime-version scratch directory inside the build directory.
    pub fn scratch_dir(&self) -> PathBuf {
        self.config.build_dir.join(self.runtime.scratch_dir_name())
    }

    /// Run every enabled stage, in order.
    ///
    /// Platform flags are requested from `provider` at most once, right
    /// before the first link stage.
    pub fn run(
        &mut self,
        runner: &mut dyn CommandRunner,
        provider: &dyn FlagProvider,
    ) -> Result<Vec<StageResult>> {
        let stages = self.config.stages;
        let mut results = Vec::new();

        if stages.object {
            results.push(self.run_object(runner)?);
        }
        if stages.shared {
            self.announce(StageKind::Shared, &self.config.shared_lib_name());
            let flags = self.platform_flags(runner, provider)?;
            let spec = self.shared_command(&flags)?;
            results.push(self.execute(
                StageKind::Shared,
                &spec,
                self.config.shared_lib_path(),
                runner,
            )?);
        }
        if stages.executable {
            let exe_name = self.config.platform.exe_file_name(&self.config.basename);
            self.announce(StageKind::Executable, &exe_name);
            let flags = self.platform_flags(runner, provider)?;
            let driver = self.materialize_driver()?;
            let spec = self.executable_command(&flags, &driver)?;
            results.push(self.execute(
                StageKind::Executable,
                &spec,
                self.config.exe_path(),
                runner,
            )?);
        }

        self.state = PipelineState::Done;
        Ok(results)
    }

    /// Every command a run would execute, without running any stage or
    /// touching the filesystem.
    pub fn plan(&self, flags: &PlatformFlags) -> Result<Vec<(StageKind, CommandSpec)>> {
        let stages = self.config.stages;
        let mut plan = Vec::new();

        if stages.object {
            let [precompile, emit] = self.object_commands();
            plan.push((StageKind::Object, precompile));
            plan.push((StageKind::Object, emit));
        }
        if stages.shared {
            plan.push((StageKind::Shared, self.shared_command(flags)?));
        }
        if stages.executable {
            plan.push((
                StageKind::Executable,
                self.executable_command(flags, &self.driver_path())?,
            ));
        }
        Ok(plan)
    }

    fn platform_flags(
        &mut self,
        runner: &mut dyn CommandRunner,
        provider: &dyn FlagProvider,
    ) -> Result<PlatformFlags> {
        if let Some(ref flags) = self.flags {
            return Ok(flags.clone());
        }
        let flags = provider.platform_flags(runner, self.runtime)?;
        self.flags = Some(flags.clone());
        Ok(flags)
    }

    fn announce(&self, kind: StageKind, artifact: &str) {
        self.shell.status(kind.status(), format!("{} ({})", artifact, kind));
    }

    fn run_object(&mut self, runner: &mut dyn CommandRunner) -> Result<StageResult> {
        let object_name = self.config.platform.object_file_name(&self.config.basename);
        self.announce(StageKind::Object, &object_name);

        let scratch = self.scratch_dir();
        fs::create_dir_all(&scratch)
            .map_err(|e| JuliacError::fs("create scratch directory", &scratch, e))?;

        // The first pass only populates the scratch depot with package caches.
        let [precompile, emit] = self.object_commands();
        self.execute(StageKind::Object, &precompile, scratch, runner)?;
        self.execute(StageKind::Object, &emit, self.config.object_path(), runner)
    }

    fn execute(
        &mut self,
        kind: StageKind,
        spec: &CommandSpec,
        artifact: PathBuf,
        runner: &mut dyn CommandRunner,
    ) -> Result<StageResult> {
        self.state = PipelineState::Running(kind);
        let command = spec.display();

        tracing::debug!("{} stage: {}", kind, command);
        self.shell.command(&command);

        let output = {
            let _spinner = self.shell.spinner(format!("building {}", kind));
            runner.run(spec)
        };

        let failure = match output {
            Ok(output) if output.is_success() => {
                if self.shell.is_verbose() {
                    for line in output.stdout.lines().chain(output.stderr.lines()) {
                        self.shell.verbose_line(line);
                    }
                }
                None
            }
            Ok(output) => Some((output.status, output.stderr)),
            Err(e) => Some((None, e.to_string())),
        };

        if let Some((status, stderr)) = failure {
            self.state = PipelineState::Failed(kind);
            return Err(JuliacError::Stage {
                stage: kind,
                command,
                status,
                stderr,
            });
        }

        Ok(StageResult {
            kind,
            artifact,
            command,
        })
    }

    /// Shared prefix of both object passes: runtime, tuning flags, no startup file.
    fn object_template(&self) -> CommandSpec {
        CommandSpec::new(&self.config.tools.julia)
            .args(self.config.tuning.runtime_flags())
            .arg("--startup-file=no")
            .cwd(&self.config.build_dir)
    }

    /// The precompile pass and the object-emitting pass.
    ///
    /// Both come from the same template; only `--output-o` differs.
    pub fn object_commands(&self) -> [CommandSpec; 2] {
        let expr = load_expression(&self.scratch_dir(), &self.config.program);
        let template = self.object_template();

        let precompile = template.clone().arg("-e").arg(expr.clone());
        let emit = template
            .arg("--output-o")
            .arg(self.config.object_path().display().to_string())
            .arg("-e")
            .arg(expr);
        [precompile, emit]
    }

    /// `cc -m<bits> -shared [adjustments] -o <lib> <object> <platform flags>`
    pub fn shared_command(&self, flags: &PlatformFlags) -> Result<CommandSpec> {
        let lib_name = self.config.shared_lib_name();
        let adj = link::shared_library(self.config.platform.os, &lib_name, self.aux_toolchain());
        let object = self.config.platform.object_file_name(&self.config.basename);

        let spec = CommandSpec::new(&self.config.tools.cc)
            .arg(self.config.platform.word_size_flag())
            .arg("-shared")
            .args(adj.args.iter().cloned())
            .arg("-o")
            .arg(lib_name)
            .arg(object)
            .args(flags.all().cloned())
            .cwd(&self.config.build_dir);
        with_search_path(spec, &adj)
    }

    /// `cc -m<bits> -DJULIAC_PROGRAM_LIBNAME="<lib>" [adjustments] -o <exe> <driver> <lib> <platform flags>`
    ///
    /// The library is named relative to the build directory so the executable
    /// records a relocatable dependency.
    pub fn executable_command(&self, flags: &PlatformFlags, driver: &Path) -> Result<CommandSpec> {
        let lib_name = self.config.shared_lib_name();
        let adj = link::executable(self.config.platform.os, self.aux_toolchain());

        let spec = CommandSpec::new(&self.config.tools.cc)
            .arg(self.config.platform.word_size_flag())
            .arg(format!("-DJULIAC_PROGRAM_LIBNAME=\"{}\"", lib_name))
            .args(adj.args.iter().cloned())
            .arg("-o")
            .arg(self.config.platform.exe_file_name(&self.config.basename))
            .arg(driver.display().to_string())
            .arg(lib_name)
            .args(flags.all().cloned())
            .cwd(&self.config.build_dir);
        with_search_path(spec, &adj)
    }

    fn aux_toolchain(&self) -> Option<AuxToolchain<'_>> {
        self.config
            .mingw_root
            .as_deref()
            .map(|root| AuxToolchain { root })
    }

    fn driver_path(&self) -> PathBuf {
        match self.config.driver {
            DriverProgram::Path(ref path) => path.clone(),
            DriverProgram::Bundled => self.scratch_dir().join(BUNDLED_DRIVER_NAME),
        }
    }

    /// Write the bundled driver into the scratch directory when it is used.
    fn materialize_driver(&self) -> Result<PathBuf> {
        let path = self.driver_path();
        if self.config.driver == DriverProgram::Bundled {
            let scratch = self.scratch_dir();
            fs::create_dir_all(&scratch)
                .map_err(|e| JuliacError::fs("create scratch directory", &scratch, e))?;
            fs::write(&path, BUNDLED_DRIVER)
                .map_err(|e| JuliacError::fs("write driver program", &path, e))?;
        }
        Ok(path)
    }
}

/// Append the adjustment's directories to the child's `PATH`.
fn with_search_path(spec: CommandSpec, adj: &LinkAdjustments) -> Result<CommandSpec> {
    if adj.search_path.is_empty() {
        return Ok(spec);
    }

    let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();
    dirs.extend(adj.search_path.iter().cloned());

    let joined: OsString = std::env::join_paths(dirs)
        .map_err(|e| JuliacError::toolchain("cc", format!("invalid search path: {}", e)))?;
    Ok(spec.env("PATH", joined.to_string_lossy()))
}

/// The Julia expression both object passes evaluate: put the scratch depot
/// first so package caches land there, then load the program.
pub fn load_expression(scratch: &Path, program: &Path) -> String {
    format!(
        "pushfirst!(Base.DEPOT_PATH, \"{}\"); include(\"{}\")",
        julia_escape(&scratch.display().to_string()),
        julia_escape(&program.display().to_string())
    )
}

/// Escape text for a Julia double-quoted string literal.
fn julia_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '"' | '$' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::flags::StaticFlags;
    use crate::core::config::{StageSet, ToolPaths};
    use crate::core::options::TuningOptions;
    use crate::core::platform::{OsFamily, Platform};
    use crate::test_support::{hello_program, JuliaInstallFixture, MockExecutor};
    use crate::util::process::ProcessOutput;
    use crate::util::shell::{ColorChoice, Verbosity};
    use tempfile::TempDir;

    fn quiet() -> Shell {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    fn config_for(program: &Path, stages: StageSet, os: OsFamily) -> BuildConfig {
        BuildConfig {
            program: program.to_path_buf(),
            basename: "hello".to_string(),
            build_dir: program.parent().unwrap().join("builddir"),
            stages,
            tuning: TuningOptions::default(),
            clean: false,
            driver: DriverProgram::Bundled,
            tools: ToolPaths {
                julia: PathBuf::from("julia"),
                cc: PathBuf::from("cc"),
            },
            mingw_root: None,
            platform: Platform::new(os, 64),
        }
    }

    fn flags() -> StaticFlags {
        StaticFlags(PlatformFlags {
            cflags: vec!["-fPIC".into()],
            ldflags: vec!["-L/opt/julia/lib".into()],
            ldlibs: vec!["-ljulia".into()],
        })
    }

    /// Executor answering julia-config queries and succeeding everything else.
    fn toolchain() -> MockExecutor {
        let mut exec = MockExecutor::new();
        exec.expect_contains("--cflags", ProcessOutput::success("-fPIC"));
        exec.expect_contains("--ldflags", ProcessOutput::success("-L/opt/julia/lib"));
        exec.expect_contains("--ldlibs", ProcessOutput::success("-ljulia"));
        exec.set_default(ProcessOutput::success(""));
        exec
    }

    #[test]
    fn test_full_pipeline_runs_stages_in_order() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let config = config_for(&program, StageSet::all(), OsFamily::Unix);
        let shell = quiet();
        let mut exec = toolchain();

        let mut pipeline = Pipeline::new(&config, &runtime, &shell);
        let results = pipeline
            .run(&mut exec, &crate::builder::flags::JuliaConfig)
            .unwrap();

        let kinds: Vec<StageKind> = results.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [StageKind::Object, StageKind::Shared, StageKind::Executable]
        );
        assert_eq!(pipeline.state(), PipelineState::Done);

        let calls = exec.calls();
        assert_eq!(calls.len(), 7);
        assert!(calls[0].starts_with("julia --startup-file=no -e "));
        assert!(calls[1].contains("--output-o"));
        assert_eq!(exec.count_containing("julia-config.jl"), 3);
        assert!(calls[5].starts_with("cc -m64 -shared -o hello.so hello.o -fPIC"));
        assert!(calls[6].starts_with("cc -m64 -DJULIAC_PROGRAM_LIBNAME=\"hello.so\" -Wl,-rpath,$ORIGIN -o hello "));
        assert!(calls[6].ends_with("hello.so -fPIC -L/opt/julia/lib -ljulia"));

        assert_eq!(results[1].artifact, config.shared_lib_path());
        assert_eq!(results[2].artifact, config.exe_path());
    }

    #[test]
    fn test_object_passes_share_template() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let mut config = config_for(&program, StageSet::all(), OsFamily::Unix);
        config.tuning.cpu_target = Some("native".into());

        let shell = quiet();
        let pipeline = Pipeline::new(&config, &runtime, &shell);
        let [precompile, emit] = pipeline.object_commands();

        let n = precompile.args.len();
        assert_eq!(&precompile.args[..n - 2], &emit.args[..n - 2]);
        assert_eq!(&precompile.args[n - 2..], &emit.args[emit.args.len() - 2..]);
        assert_eq!(emit.args[n - 2], "--output-o");
        assert_eq!(emit.args.len(), n + 2);
        assert_eq!(precompile.args[0], "-Cnative");
        assert_eq!(precompile.cwd.as_deref(), Some(config.build_dir.as_path()));
    }

    #[test]
    fn test_object_only_never_queries_flags() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let stages = StageSet {
            object: true,
            ..Default::default()
        };
        let config = config_for(&program, stages, OsFamily::Unix);
        let shell = quiet();
        let mut exec = toolchain();

        let results = Pipeline::new(&config, &runtime, &shell)
            .run(&mut exec, &crate::builder::flags::JuliaConfig)
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].artifact, config.object_path());
        assert_eq!(exec.calls().len(), 2);
        assert_eq!(exec.count_containing("julia-config.jl"), 0);
        assert_eq!(exec.count_containing("cc "), 0);
        assert!(config.build_dir.join("tmp_v1.10.2").is_dir());
    }

    #[test]
    fn test_shared_failure_stops_pipeline() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let config = config_for(&program, StageSet::all(), OsFamily::Unix);
        let shell = quiet();

        let mut exec = MockExecutor::new();
        exec.expect_contains(" -shared ", ProcessOutput::failure(1, "ld: cannot find -ljulia"));
        exec.set_default(ProcessOutput::success(""));

        let mut pipeline = Pipeline::new(&config, &runtime, &shell);
        let err = pipeline.run(&mut exec, &flags()).unwrap_err();

        match err {
            JuliacError::Stage {
                stage,
                status,
                ref stderr,
                ref command,
            } => {
                assert_eq!(stage, StageKind::Shared);
                assert_eq!(status, Some(1));
                assert!(stderr.contains("cannot find -ljulia"));
                assert!(command.contains("-o hello.so"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pipeline.state(), PipelineState::Failed(StageKind::Shared));
        assert_eq!(exec.count_containing("JULIAC_PROGRAM_LIBNAME"), 0);
    }

    #[test]
    fn test_first_object_pass_failure_skips_second() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let config = config_for(&program, StageSet::all(), OsFamily::Unix);
        let shell = quiet();

        let mut exec = MockExecutor::new();
        exec.expect_prefix("julia", ProcessOutput::failure(1, "ERROR: LoadError"));

        let mut pipeline = Pipeline::new(&config, &runtime, &shell);
        let err = pipeline.run(&mut exec, &flags()).unwrap_err();

        assert!(matches!(
            err,
            JuliacError::Stage {
                stage: StageKind::Object,
                ..
            }
        ));
        assert_eq!(exec.calls().len(), 1);
        assert_eq!(pipeline.state(), PipelineState::Failed(StageKind::Object));
    }

    #[test]
    fn test_spawn_failure_is_stage_error() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let stages = StageSet {
            object: true,
            ..Default::default()
        };
        let config = config_for(&program, stages, OsFamily::Unix);
        let shell = quiet();

        // No expectations: every command fails to spawn.
        let mut exec = MockExecutor::new();
        let err = Pipeline::new(&config, &runtime, &shell)
            .run(&mut exec, &flags())
            .unwrap_err();

        match err {
            JuliacError::Stage { status, stderr, .. } => {
                assert_eq!(status, None);
                assert!(stderr.contains("unexpected command"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bundled_driver_is_written_to_scratch() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let stages = StageSet {
            executable: true,
            ..Default::default()
        };
        let config = config_for(&program, stages, OsFamily::Unix);
        let shell = quiet();
        let mut exec = toolchain();

        let results = Pipeline::new(&config, &runtime, &shell)
            .run(&mut exec, &flags())
            .unwrap();
        assert_eq!(results.len(), 1);

        let driver = config.build_dir.join("tmp_v1.10.2").join(BUNDLED_DRIVER_NAME);
        assert_eq!(fs::read_to_string(&driver).unwrap(), BUNDLED_DRIVER);
        assert!(exec.calls()[0].contains(&driver.display().to_string()));
    }

    #[test]
    fn test_custom_driver_is_used_as_is() {
        let (tmp, program) = hello_program();
        let driver = tmp.path().join("main.c");
        fs::write(&driver, "int main(void) { return 0; }\n").unwrap();

        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let mut config = config_for(
            &program,
            StageSet {
                executable: true,
                ..Default::default()
            },
            OsFamily::Unix,
        );
        config.driver = DriverProgram::Path(driver.clone());
        let shell = quiet();

        let plan = Pipeline::new(&config, &runtime, &shell)
            .plan(&PlatformFlags::default())
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan[0].1.args.contains(&driver.display().to_string()));
        assert!(!config.build_dir.exists());
    }

    #[test]
    fn test_apple_link_commands() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let config = config_for(&program, StageSet::all(), OsFamily::Apple);
        let shell = quiet();

        let pipeline = Pipeline::new(&config, &runtime, &shell);
        let shared = pipeline.shared_command(&PlatformFlags::default()).unwrap();
        assert_eq!(
            shared.args,
            [
                "-m64",
                "-shared",
                "-Wl,-install_name,@rpath/hello.dylib",
                "-o",
                "hello.dylib",
                "hello.o"
            ]
        );

        let exe = pipeline
            .executable_command(&PlatformFlags::default(), Path::new("program.c"))
            .unwrap();
        assert!(exe.args.contains(&"-Wl,-rpath,@executable_path".to_string()));
        assert!(exe.args.contains(&"-DJULIAC_PROGRAM_LIBNAME=\"hello.dylib\"".to_string()));
    }

    #[test]
    fn test_windows_aux_toolchain_extends_path() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let mingw = TempDir::new().unwrap();
        let mut config = config_for(&program, StageSet::all(), OsFamily::Windows);
        config.mingw_root = Some(mingw.path().to_path_buf());
        let shell = quiet();

        let pipeline = Pipeline::new(&config, &runtime, &shell);
        let exe = pipeline
            .executable_command(&PlatformFlags::default(), Path::new("program.c"))
            .unwrap();

        assert!(exe.args.contains(&"hello.exe".to_string()));
        assert!(exe.args.contains(&"hello.dll".to_string()));
        let (key, value) = &exe.env[0];
        assert_eq!(key, "PATH");
        assert!(value.contains(&mingw.path().join("bin").display().to_string()));

        let shared = pipeline.shared_command(&PlatformFlags::default()).unwrap();
        assert!(shared.args.contains(&"-Wl,--export-all-symbols".to_string()));
    }

    #[test]
    fn test_load_expression_escapes_paths() {
        let expr = load_expression(
            Path::new("/tmp/build/tmp_v1.10.2"),
            Path::new("/home/u/my \"$app\".jl"),
        );
        assert_eq!(
            expr,
            r#"pushfirst!(Base.DEPOT_PATH, "/tmp/build/tmp_v1.10.2"); include("/home/u/my \"\$app\".jl")"#
        );
    }

    #[test]
    fn test_plan_matches_run() {
        let (_tmp, program) = hello_program();
        let fixture = JuliaInstallFixture::new();
        let runtime = fixture.runtime();
        let config = config_for(&program, StageSet::all(), OsFamily::Unix);
        let shell = quiet();
        let static_flags = flags();

        let planned: Vec<String> = Pipeline::new(&config, &runtime, &shell)
            .plan(&static_flags.0)
            .unwrap()
            .iter()
            .map(|(_, spec)| spec.display())
            .collect();

        let mut exec = toolchain();
        Pipeline::new(&config, &runtime, &shell)
            .run(&mut exec, &static_flags)
            .unwrap();

        assert_eq!(planned, exec.calls());
    }
}
