//! Staging tree assembly: copy source roots into the package directory.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::common::{copy_tree, staged_path, EntryKind};

/// One copy performed while staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub kind: EntryKind,
}

/// Ordered record of everything copied under one destination root.
#[derive(Debug)]
pub struct StagingTree {
    root: PathBuf,
    entries: Vec<StagedEntry>,
}

impl StagingTree {
    /// Start staging into `root`, which must already exist.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[StagedEntry] {
        &self.entries
    }

    /// Number of regular files staged.
    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::File)
            .count()
    }

    /// Copy one source root (directory or single file) into the tree.
    ///
    /// `entry` is the root as configured (`../bin`); it is read from
    /// `base.join(entry)` and lands at `root/<entry without leading ..>`.
    /// The first failure aborts with the offending path in the error.
    pub fn stage(&mut self, base: &Path, entry: &Path) -> Result<()> {
        let source_root = base.join(entry);
        let dest_root = staged_path(&self.root, entry);
        if dest_root == self.root {
            bail!(
                "Source root {} would overwrite the staging root",
                entry.display()
            );
        }

        let mut staged = Vec::new();
        copy_tree(&source_root, &dest_root, |source, dest, kind| {
            staged.push(StagedEntry {
                source: source.to_path_buf(),
                dest: dest.to_path_buf(),
                kind,
            })
        })
        .with_context(|| format!("Failed to stage {}", entry.display()))?;

        tracing::debug!(entry = %entry.display(), copied = staged.len(), "staged source root");
        self.entries.extend(staged);
        Ok(())
    }
}
