//! Host platform classification.
//!
//! Everything platform-specific in the pipeline branches on [`OsFamily`] only,
//! so link flags and file naming stay a pure function of a three-way value.

use std::fmt;

/// Three-way OS classification used for link adjustments and file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// Microsoft Windows
    Windows,
    /// macOS and other Darwin-based systems
    Apple,
    /// Linux, the BSDs and other Unix-like systems
    Unix,
}

impl OsFamily {
    /// Classify the host the binary was compiled for.
    pub fn host() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else if cfg!(target_vendor = "apple") {
            OsFamily::Apple
        } else {
            OsFamily::Unix
        }
    }

    /// Dynamic library extension, without the leading dot.
    pub fn dylib_extension(&self) -> &'static str {
        match self {
            OsFamily::Windows => "dll",
            OsFamily::Apple => "dylib",
            OsFamily::Unix => "so",
        }
    }

    /// Executable suffix, including the leading dot when present.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            OsFamily::Windows => ".exe",
            OsFamily::Apple | OsFamily::Unix => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Apple => "apple",
            OsFamily::Unix => "unix",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target platform: OS family plus pointer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: OsFamily,
    /// Target bit width, passed to the C compiler as `-m<bits>`.
    pub word_size: u32,
}

impl Platform {
    pub fn host() -> Self {
        Platform {
            os: OsFamily::host(),
            word_size: usize::BITS,
        }
    }

    pub fn new(os: OsFamily, word_size: u32) -> Self {
        Platform { os, word_size }
    }

    /// The `-m32`/`-m64` flag for C compiler invocations.
    pub fn word_size_flag(&self) -> String {
        format!("-m{}", self.word_size)
    }

    pub fn object_file_name(&self, basename: &str) -> String {
        format!("{}.o", basename)
    }

    pub fn shared_lib_file_name(&self, basename: &str) -> String {
        format!("{}.{}", basename, self.os.dylib_extension())
    }

    pub fn exe_file_name(&self, basename: &str) -> String {
        format!("{}{}", basename, self.os.exe_suffix())
    }
}
