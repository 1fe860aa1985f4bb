//! Utilities for file operations with automatic parent directory creation.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Write a file, creating parent directories as needed.
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write: {}", path.display()))?;
    Ok(())
}

/// Write a file with specific Unix permissions, creating parent directories as needed.
///
/// # Arguments
/// * `path` - Path to the file to write
/// * `content` - Content to write
/// * `mode` - Unix permission bits (e.g., 0o644, 0o600)
pub fn write_file_mode<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
    mode: u32,
) -> Result<()> {
    let path = path.as_ref();
    write_file_with_dirs(path, content)?;
    set_mode(path, mode)
}

/// Set the permission bits of a file or directory.
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

/// Permission bits of an existing path.
pub fn mode_of(path: &Path) -> Result<u32> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    Ok(metadata.permissions().mode() & 0o7777)
}

/// Copy a single file, keeping the source's permission bits on the copy.
///
/// An existing destination is overwritten.
pub fn copy_file_preserving_mode(src: &Path, dst: &Path) -> Result<()> {
    let mode = mode_of(src)?;
    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    set_mode(dst, mode)
}

/// Rewrite a file in place, keeping its permission bits.
pub fn rewrite_preserving_mode(path: &Path, content: &[u8]) -> Result<()> {
    let mode = mode_of(path)?;
    fs::write(path, content).with_context(|| format!("Failed to write: {}", path.display()))?;
    set_mode(path, mode)
}

/// Remove a directory tree if present. Returns true if something was removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    if !path.exists() && !path.is_symlink() {
        return Ok(false);
    }
    fs::remove_dir_all(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(true)
}

/// Remove a single file (or symlink) if present. Returns true if something was removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    if !path.exists() && !path.is_symlink() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(true)
}
