//! `juliac doctor` command

use anyhow::Result;

use super::load_merged_config;
use crate::cli::DoctorArgs;
use juliac::core::Platform;
use juliac::ops::{doctor, format_report, DoctorOptions};
use juliac::util::process::SystemRunner;
use juliac::util::Shell;

pub fn execute(_args: DoctorArgs, shell: &Shell) -> Result<()> {
    let config = load_merged_config()?;
    let options = DoctorOptions {
        toolchain: config.toolchain,
        platform: Platform::host(),
    };

    let report = doctor(&options, &mut SystemRunner);

    // Print the formatted report
    print!("{}", format_report(&report, shell.is_verbose()));

    // Exit with error code if required checks failed
    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}
