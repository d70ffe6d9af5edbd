//! `juliac build` command

use anyhow::Result;

use super::load_merged_config;
use crate::cli::BuildArgs;
use juliac::core::{BuildRequest, RawTuning, Scalar, StageSet, DEFAULT_BUILD_DIR};
use juliac::ops::juliac_build::{build, BuildOptions, BuildOutcome};
use juliac::util::process::SystemRunner;
use juliac::util::Shell;

pub fn execute(args: BuildArgs, shell: &Shell) -> Result<()> {
    let config = load_merged_config()?;
    let dry_run = args.dry_run;

    // CLI > project config > global config > defaults
    let mut tuning = config.build.tuning;
    tuning.merge(cli_tuning(&args));

    let mut request = BuildRequest::new(args.program.clone());
    request.driver = args.driver.clone();
    request.build_dir = args
        .build_dir
        .clone()
        .or(config.build.build_dir)
        .unwrap_or_else(|| DEFAULT_BUILD_DIR.into());
    request.tuning = tuning;
    request.clean = args.clean;
    request.toolchain = config.toolchain;

    // Without an explicit stage, build the executable and everything it needs.
    if args.object || args.shared || args.executable || args.sync_libs {
        request.stages = StageSet {
            object: args.object,
            shared: args.shared,
            executable: args.executable,
            sync_libraries: args.sync_libs,
        };
        request.autodeps = args.autodeps;
    } else {
        request.autodeps = true;
    }

    let opts = BuildOptions {
        dry_run,
        ..BuildOptions::default()
    };

    let outcome = build(&request, &opts, shell, &mut SystemRunner)?;

    if dry_run {
        print_plan(&outcome);
    }

    Ok(())
}

/// Raw option strings, validated later by the resolver.
fn cli_tuning(args: &BuildArgs) -> RawTuning {
    let scalar = |v: &Option<String>| v.as_deref().map(Scalar::from);
    RawTuning {
        sysimage: args.sysimage.clone(),
        compile: scalar(&args.compile),
        cpu_target: args.cpu_target.clone(),
        optimize: scalar(&args.optimize),
        debug: scalar(&args.debug),
        inline: scalar(&args.inline),
        check_bounds: scalar(&args.check_bounds),
        math_mode: scalar(&args.math_mode),
        depwarn: scalar(&args.depwarn),
    }
}

fn print_plan(outcome: &BuildOutcome) {
    for (kind, spec) in &outcome.planned {
        match &spec.cwd {
            Some(dir) => println!("# {} (in {})", kind, dir.display()),
            None => println!("# {}", kind),
        }
        for (key, value) in &spec.env {
            println!("{}={} \\", key, value);
        }
        println!("{}", spec);
    }
    for dir in &outcome.planned_sync {
        println!("# sync libraries from {}", dir.display());
    }
}
