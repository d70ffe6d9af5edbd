//! Configuration file support for juliac.
//!
//! juliac reads `juliac.toml` from two locations:
//! - Global: `~/.juliac/juliac.toml` - User-wide defaults
//! - Project: `./juliac.toml` - Overrides for the current directory
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.
//!
//! ```toml
//! [toolchain]
//! julia = "/opt/julia-1.10/bin/julia"
//! cc = "clang"
//!
//! [build]
//! build_dir = "out"
//! optimize = 3
//! cpu_target = "native"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::config::ToolchainSettings;
use crate::core::options::RawTuning;
use crate::error::{JuliacError, Result};

/// File name looked up in the global and project locations.
pub const CONFIG_FILE_NAME: &str = "juliac.toml";

/// juliac configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tool locations
    pub toolchain: ToolchainSettings,

    /// Build defaults
    pub build: BuildDefaults,
}

/// Defaults for `juliac build`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildDefaults {
    /// Build directory, relative to the program
    pub build_dir: Option<PathBuf>,

    /// Runtime tuning options
    #[serde(flatten)]
    pub tuning: RawTuning,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| JuliacError::fs("read config file", path, e))?;

        toml::from_str(&contents).map_err(|source| JuliacError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        self.toolchain.merge(other.toolchain);

        if other.build.build_dir.is_some() {
            self.build.build_dir = other.build.build_dir;
        }
        self.build.tuning.merge(other.build.tuning);
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (./juliac.toml)
/// 2. Global config (~/.juliac/juliac.toml)
/// 3. Defaults
///
/// Missing files are skipped. A file that exists but does not parse is an
/// error, never a silent fallback to defaults.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    for path in global_path.into_iter().chain(Some(project_path)) {
        if path.exists() {
            tracing::debug!("loading config from {}", path.display());
            config.merge(Config::load(path)?);
        }
    }

    Ok(config)
}

/// Get the global juliac config directory (~/.juliac).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".juliac"))
}

/// Get the global config path (~/.juliac/juliac.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Get the project config path (<dir>/juliac.toml).
pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}
