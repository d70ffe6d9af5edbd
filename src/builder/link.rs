//! Per-OS link adjustments for the shared library and executable stages.

use std::path::{Path, PathBuf};

use crate::core::platform::OsFamily;

/// Extra link arguments and DLL search directories for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAdjustments {
    pub args: Vec<String>,
    /// Directories appended to the child's `PATH`
    pub search_path: Vec<PathBuf>,
}

/// An auxiliary MinGW toolchain root, honored on Windows only.
#[derive(Debug, Clone, Copy)]
pub struct AuxToolchain<'a> {
    pub root: &'a Path,
}

impl AuxToolchain<'_> {
    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    fn apply(&self, adj: &mut LinkAdjustments) {
        adj.args
            .push(format!("-I{}", self.include_dir().display()));
        adj.search_path.push(self.bin_dir());
    }
}

/// Adjustments for linking `lib_name` as a shared library.
pub fn shared_library(os: OsFamily, lib_name: &str, aux: Option<AuxToolchain<'_>>) -> LinkAdjustments {
    let mut adj = LinkAdjustments::default();
    match os {
        OsFamily::Apple => adj
            .args
            .push(format!("-Wl,-install_name,@rpath/{}", lib_name)),
        OsFamily::Windows => {
            adj.args.push("-Wl,--export-all-symbols".to_string());
            if let Some(aux) = aux {
                aux.apply(&mut adj);
            }
        }
        OsFamily::Unix => {}
    }
    adj
}

/// Adjustments for linking the executable so it finds the shared library
/// next to itself at run time.
pub fn executable(os: OsFamily, aux: Option<AuxToolchain<'_>>) -> LinkAdjustments {
    let mut adj = LinkAdjustments::default();
    match os {
        OsFamily::Apple => adj.args.push("-Wl,-rpath,@executable_path".to_string()),
        OsFamily::Unix => adj.args.push("-Wl,-rpath,$ORIGIN".to_string()),
        OsFamily::Windows => {
            if let Some(aux) = aux {
                aux.apply(&mut adj);
            }
        }
    }
    adj
}
