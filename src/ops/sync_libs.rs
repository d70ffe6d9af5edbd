//! Copy the runtime's shared libraries next to the built artifacts.
//!
//! Candidates come from the runtime's public and private library directories.
//! A candidate is copied when the destination is missing or differs in size,
//! or when the source is newer by modification or creation time.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;
use walkdir::WalkDir;

use crate::core::platform::OsFamily;
use crate::error::{JuliacError, Result};
use crate::util::shell::{Shell, Status};

/// File facts the copy decision looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
    /// Not every filesystem records this.
    pub created: Option<SystemTime>,
}

impl LibraryFile {
    /// Stat `path`, following symlinks. `Ok(None)` when it does not exist.
    pub fn stat(path: &Path) -> Result<Option<Self>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(LibraryFile {
                path: path.to_path_buf(),
                size: meta.len(),
                modified: meta.modified().ok(),
                created: meta.created().ok(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(JuliacError::fs("stat", path, e)),
        }
    }
}

/// Outcome of one synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Destination paths written, in candidate order
    pub copied: Vec<PathBuf>,
    /// Candidates already up to date
    pub up_to_date: usize,
}

/// `libfoo.so`, optionally followed by numeric version components.
static UNIX_LIB_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^lib.+\.so(\.\d+)*$").unwrap());

/// Whether a file name looks like a shared library on `os`.
pub fn is_library_name(name: &str, os: OsFamily) -> bool {
    match os {
        OsFamily::Unix => UNIX_LIB_NAME.is_match(name),
        OsFamily::Windows | OsFamily::Apple => Path::new(name)
            .extension()
            .is_some_and(|ext| ext == os.dylib_extension()),
    }
}

/// Debug variants of the runtime libraries are never shipped.
fn is_debug_variant(path: &Path) -> bool {
    path.to_string_lossy().contains("debug")
}

/// Library files directly inside `dirs`, in directory order then by name.
///
/// Missing directories are skipped.
pub fn find_candidates(dirs: &[PathBuf], os: OsFamily) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            tracing::warn!("library directory {} does not exist", dir.display());
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                JuliacError::fs("read library directory", path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if is_library_name(&name, os) && !is_debug_variant(entry.path()) {
                found.push(entry.into_path());
            }
        }
        candidates.extend(found);
    }

    Ok(candidates)
}

/// Whether `src` must be copied over `dst`.
pub fn needs_copy(src: &LibraryFile, dst: Option<&LibraryFile>) -> bool {
    let Some(dst) = dst else {
        return true;
    };
    if src.size != dst.size {
        return true;
    }
    let newer = |a: Option<SystemTime>, b: Option<SystemTime>| matches!((a, b), (Some(a), Some(b)) if a > b);
    newer(src.created, dst.created) || newer(src.modified, dst.modified)
}

/// Copy every candidate from `lib_dirs` that needs it into `dest_dir`.
///
/// When the shell is verbose, each copied file name is listed, or `none`.
pub fn sync_libraries(
    lib_dirs: &[PathBuf],
    dest_dir: &Path,
    os: OsFamily,
    shell: &Shell,
) -> Result<SyncReport> {
    fs::create_dir_all(dest_dir)
        .map_err(|e| JuliacError::fs("create directory", dest_dir, e))?;

    shell.status(
        Status::Syncing,
        format!("runtime libraries into {}", dest_dir.display()),
    );

    let mut report = SyncReport::default();
    for src_path in find_candidates(lib_dirs, os)? {
        let Some(name) = src_path.file_name() else {
            continue;
        };
        let dst_path = dest_dir.join(name);

        let Some(src) = LibraryFile::stat(&src_path)? else {
            continue;
        };
        let dst = LibraryFile::stat(&dst_path)?;

        if !needs_copy(&src, dst.as_ref()) {
            report.up_to_date += 1;
            continue;
        }

        // Remove first so a symlink at the destination is replaced, not written through.
        if dst.is_some() {
            fs::remove_file(&dst_path)
                .map_err(|e| JuliacError::fs("remove", &dst_path, e))?;
        }
        fs::copy(&src_path, &dst_path).map_err(|e| JuliacError::fs("copy", &src_path, e))?;
        tracing::debug!("copied {} -> {}", src_path.display(), dst_path.display());
        report.copied.push(dst_path);
    }

    if report.copied.is_empty() {
        shell.verbose_line("none");
    } else {
        for path in &report.copied {
            if let Some(name) = path.file_name() {
                shell.verbose_line(name.to_string_lossy());
            }
        }
    }

    Ok(report)
}
