//! Command implementations

pub mod build;
pub mod completions;
pub mod doctor;

use anyhow::Context;
use juliac::util::config::{global_config_path, load_config, project_config_path};
use juliac::util::Config;

/// Global config merged with `./juliac.toml`.
pub(crate) fn load_merged_config() -> anyhow::Result<Config> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let config = load_config(global_config_path().as_deref(), &project_config_path(&cwd))?;
    Ok(config)
}
