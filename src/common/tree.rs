//! Mode-preserving copies of whole trees.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::files::{copy_file_preserving_mode, mode_of, set_mode};
use super::walk::walk;

/// What a copied entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Symlink,
}

/// Copy one walked entry to `dest`.
///
/// Symlinks are recreated with the same target, directories are created with
/// the source mode and files are copied with their mode.
pub fn copy_entry(src: &Path, dest: &Path, metadata: &fs::Metadata) -> Result<EntryKind> {
    let file_type = metadata.file_type();

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    if file_type.is_symlink() {
        let target = fs::read_link(src)
            .with_context(|| format!("Failed to read symlink {}", src.display()))?;
        std::os::unix::fs::symlink(&target, dest)
            .with_context(|| format!("Failed to create symlink {}", dest.display()))?;
        return Ok(EntryKind::Symlink);
    }

    if file_type.is_dir() {
        fs::create_dir(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
        set_mode(dest, mode_of(src)?)?;
        return Ok(EntryKind::Dir);
    }

    copy_file_preserving_mode(src, dest)?;
    Ok(EntryKind::File)
}

/// Copy `src` (directory or file) to `dest`, which must not exist yet.
///
/// Calls `on_entry` with each destination path after it is copied.
pub fn copy_tree<F>(src: &Path, dest: &Path, mut on_entry: F) -> Result<()>
where
    F: FnMut(&Path, &Path, EntryKind),
{
    walk(src, |path, metadata| {
        let relative = path
            .strip_prefix(src)
            .with_context(|| format!("{} is outside {}", path.display(), src.display()))?;
        let target = if relative.as_os_str().is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(relative)
        };

        let kind = copy_entry(path, &target, metadata)?;
        on_entry(path, &target, kind);
        Ok(())
    })
}
