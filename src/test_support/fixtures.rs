//! Test fixtures: a fake Julia installation and a sample program.

use std::fs;
use std::path::{Path, PathBuf};

use semver::Version;
use tempfile::TempDir;

use crate::builder::toolchain::RuntimeInstall;
use crate::util::process::ProcessOutput;

/// Source of a minimal embeddable Julia program.
pub const HELLO_PROGRAM: &str = r#"Base.@ccallable function julia_main(ARGS::Vector{String})::Cint
    println("hello, world")
    return 0
end
"#;

/// A fake Julia installation tree:
///
/// ```text
/// <root>/bin/julia
/// <root>/share/julia/julia-config.jl
/// <root>/lib/            (public libraries)
/// <root>/lib/julia/      (private libraries)
/// ```
pub struct JuliaInstallFixture {
    pub tmp: TempDir,
}

impl JuliaInstallFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let root = tmp.path();
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::create_dir_all(root.join("share").join("julia")).unwrap();
        fs::create_dir_all(root.join("lib").join("julia")).unwrap();
        let julia = root.join("bin").join("julia");
        fs::write(&julia, "").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&julia, fs::Permissions::from_mode(0o755)).unwrap();
        }
        fs::write(
            root.join("share").join("julia").join("julia-config.jl"),
            "# julia-config\n",
        )
        .unwrap();
        JuliaInstallFixture { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn bindir(&self) -> PathBuf {
        self.root().join("bin")
    }

    pub fn public_lib_dir(&self) -> PathBuf {
        self.root().join("lib")
    }

    pub fn private_lib_dir(&self) -> PathBuf {
        self.root().join("lib").join("julia")
    }

    /// Add a library file with the given content to `dir`.
    pub fn add_lib(&self, dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// What the runtime query prints for this tree: version, then `Sys.BINDIR`.
    pub fn runtime_query_output(&self) -> ProcessOutput {
        ProcessOutput::success(format!("1.10.2\n{}\n", self.bindir().display()))
    }

    /// A runtime description rooted at this tree.
    pub fn runtime(&self) -> RuntimeInstall {
        RuntimeInstall::new(
            self.bindir().join("julia"),
            self.bindir(),
            Version::new(1, 10, 2),
        )
    }
}

impl Default for JuliaInstallFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `hello.jl` into a fresh temp directory.
pub fn hello_program() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let program = tmp.path().join("hello.jl");
    fs::write(&program, HELLO_PROGRAM).expect("failed to write program");
    (tmp, program)
}
