//! Build configuration resolution.
//!
//! [`resolve`] turns a caller's [`BuildRequest`] into an immutable
//! [`BuildConfig`]. It validates enumerated options first, then checks input
//! files, then locates tools, and never spawns a process. Stage dependency
//! expansion happens here, once.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::options::{RawTuning, TuningOptions};
use crate::core::platform::{OsFamily, Platform};
use crate::error::{JuliacError, Result};

/// Which pipeline stages (and the library sync) are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSet {
    pub object: bool,
    pub shared: bool,
    pub executable: bool,
    pub sync_libraries: bool,
}

impl StageSet {
    /// Every stage plus the library sync.
    pub fn all() -> Self {
        StageSet {
            object: true,
            shared: true,
            executable: true,
            sync_libraries: true,
        }
    }

    /// Apply dependency expansion: executable needs shared, shared needs object.
    ///
    /// Never disables a stage, and applying it twice is the same as once.
    pub fn expand(self) -> Self {
        let shared = self.shared || self.executable;
        let object = self.object || shared;
        StageSet {
            object,
            shared,
            ..self
        }
    }

    /// Whether any stage needs the C compiler and the runtime's link flags.
    pub fn needs_linking(&self) -> bool {
        self.shared || self.executable
    }

    pub fn is_empty(&self) -> bool {
        !(self.object || self.shared || self.executable || self.sync_libraries)
    }
}

/// Tool locations as configured by the caller. Unset entries are searched for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Julia binary (name on PATH or a path)
    pub julia: Option<PathBuf>,

    /// C compiler (name on PATH or a path)
    pub cc: Option<PathBuf>,

    /// Root of an auxiliary MinGW toolchain, used on Windows only
    pub mingw_root: Option<PathBuf>,
}

impl ToolchainSettings {
    /// Merge another set of settings into this one (other takes precedence).
    pub fn merge(&mut self, other: ToolchainSettings) {
        if other.julia.is_some() {
            self.julia = other.julia;
        }
        if other.cc.is_some() {
            self.cc = other.cc;
        }
        if other.mingw_root.is_some() {
            self.mingw_root = other.mingw_root;
        }
    }
}

/// Raw caller request, before validation.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Julia source program
    pub program: PathBuf,

    /// C driver program for the executable (bundled driver when `None`)
    pub driver: Option<PathBuf>,

    /// Build directory, relative to the program's directory unless absolute
    pub build_dir: PathBuf,

    pub tuning: RawTuning,

    pub stages: StageSet,

    /// Expand stage dependencies (executable => shared => object)
    pub autodeps: bool,

    /// Delete the build directory before building
    pub clean: bool,

    pub toolchain: ToolchainSettings,
}

impl BuildRequest {
    /// A request with default options for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        BuildRequest {
            program: program.into(),
            driver: None,
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            tuning: RawTuning::default(),
            stages: StageSet {
                executable: true,
                sync_libraries: true,
                ..StageSet::default()
            },
            autodeps: false,
            clean: false,
            toolchain: ToolchainSettings::default(),
        }
    }
}

/// Default build directory name.
pub const DEFAULT_BUILD_DIR: &str = "builddir";

/// The C driver program linked into the executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverProgram {
    /// The minimal driver shipped with juliac
    Bundled,
    /// A caller-supplied driver (absolute path, known to exist)
    Path(PathBuf),
}

/// Resolved tool paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub julia: PathBuf,
    pub cc: PathBuf,
}

/// Fully resolved, immutable build configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Absolute path of the Julia program
    pub program: PathBuf,

    /// Output basename, the program's file stem
    pub basename: String,

    /// Absolute build directory
    pub build_dir: PathBuf,

    /// Enabled stages; expanded along `executable ⇒ shared ⇒ object` only when autodeps is on
    pub stages: StageSet,

    pub tuning: TuningOptions,

    pub clean: bool,

    pub driver: DriverProgram,

    pub tools: ToolPaths,

    pub mingw_root: Option<PathBuf>,

    pub platform: Platform,
}

impl BuildConfig {
    pub fn object_path(&self) -> PathBuf {
        self.build_dir
            .join(self.platform.object_file_name(&self.basename))
    }

    pub fn shared_lib_name(&self) -> String {
        self.platform.shared_lib_file_name(&self.basename)
    }

    pub fn shared_lib_path(&self) -> PathBuf {
        self.build_dir.join(self.shared_lib_name())
    }

    pub fn exe_path(&self) -> PathBuf {
        self.build_dir.join(self.platform.exe_file_name(&self.basename))
    }
}

/// Resolve a request into a validated configuration for `platform`.
pub fn resolve(request: &BuildRequest, platform: Platform) -> Result<BuildConfig> {
    let tuning = request.tuning.validate()?;

    let stages = if request.autodeps {
        request.stages.expand()
    } else {
        request.stages
    };

    let program = absolute(&request.program)?;
    if !program.is_file() {
        return Err(JuliacError::FileNotFound {
            what: "Julia program",
            path: program,
        });
    }

    let driver = match (&request.driver, stages.executable) {
        (Some(path), true) => {
            let path = absolute(path)?;
            if !path.is_file() {
                return Err(JuliacError::FileNotFound {
                    what: "C driver program",
                    path,
                });
            }
            DriverProgram::Path(path)
        }
        _ => DriverProgram::Bundled,
    };

    // The build directory is relative to the program, not the caller's cwd.
    let program_dir = program.parent().unwrap_or(Path::new("/"));
    let build_dir = program_dir.join(&request.build_dir);

    let basename = program
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());

    let mut tuning = tuning;
    if let Some(image) = tuning.sysimage.take() {
        tuning.sysimage = Some(absolute(&image)?);
    }

    let tools = ToolPaths {
        julia: locate_tool(
            "julia",
            request.toolchain.julia.as_deref(),
            "JULIA",
            &["julia"],
            !stages.is_empty(),
        )?,
        cc: locate_tool(
            "C compiler",
            request.toolchain.cc.as_deref(),
            "CC",
            default_c_compilers(platform.os),
            stages.needs_linking(),
        )?,
    };

    tracing::debug!(
        "resolved {} -> {} (stages: {:?})",
        program.display(),
        build_dir.display(),
        stages
    );

    Ok(BuildConfig {
        program,
        basename,
        build_dir,
        stages,
        tuning,
        clean: request.clean,
        driver,
        tools,
        mingw_root: request.toolchain.mingw_root.clone(),
        platform,
    })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| JuliacError::fs("resolve path", path, e))
}

/// C compilers searched for on `PATH`, in order, when none is configured.
pub(crate) fn default_c_compilers(os: OsFamily) -> &'static [&'static str] {
    match os {
        OsFamily::Windows => &["x86_64-w64-mingw32-gcc", "gcc", "cc"],
        OsFamily::Apple => &["cc", "clang", "gcc"],
        OsFamily::Unix => &["cc", "gcc", "clang"],
    }
}

/// Find a tool: explicit setting, then environment variable, then PATH.
///
/// When the tool is not `required` and cannot be found, the first candidate
/// name is returned unresolved; it is never invoked.
fn locate_tool(
    what: &str,
    explicit: Option<&Path>,
    env_var: &str,
    candidates: &[&str],
    required: bool,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return match which::which(path) {
            Ok(found) => Ok(found),
            Err(_) if !required => Ok(path.to_path_buf()),
            Err(e) => Err(JuliacError::toolchain(
                what,
                format!("configured {} `{}` not usable: {}", what, path.display(), e),
            )),
        };
    }

    if let Some(value) = std::env::var_os(env_var).filter(|v| !v.is_empty()) {
        if let Ok(found) = which::which(&value) {
            return Ok(found);
        }
        tracing::warn!(
            "{} is set to `{}` but it cannot be found",
            env_var,
            value.to_string_lossy()
        );
    }

    for name in candidates {
        if let Ok(found) = which::which(name) {
            return Ok(found);
        }
    }

    if required {
        Err(JuliacError::toolchain(
            what,
            format!(
                "no {} found (tried {}); set {} or configure it in juliac.toml",
                what,
                candidates.join(", "),
                env_var
            ),
        ))
    } else {
        Ok(PathBuf::from(candidates.first().copied().unwrap_or(what)))
    }
}
