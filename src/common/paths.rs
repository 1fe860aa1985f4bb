//! Utilities for path normalization and directory management.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Strip leading `..` and `.` components from a relative source path.
///
/// Source roots are written relative to the packager's working directory
/// (`../bin`, `./agent_utils`); the staged copy must land under the
/// destination root no matter how the source was spelled.
pub fn strip_parent_prefix(path: &Path) -> PathBuf {
    path.components()
        .skip_while(|c| matches!(c, Component::ParentDir | Component::CurDir))
        .collect()
}

/// Join a source path onto a destination root after stripping its
/// parent-relative prefix.
pub fn staged_path(dest_root: &Path, source: &Path) -> PathBuf {
    dest_root.join(strip_parent_prefix(source))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Ensure all parent directories of a file exist.
pub fn ensure_parent_exists(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    Ok(())
}
