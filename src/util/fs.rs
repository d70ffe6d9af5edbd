//! Filesystem utilities.

use std::fs;
use std::path::Path;

use crate::error::{JuliacError, Result};

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| JuliacError::fs("remove directory", path, e))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        fs::create_dir_all(path).map_err(|e| JuliacError::fs("create directory", path, e))?;
    }
    Ok(())
}
