//! Utilities for managing work directories that are rebuilt on every run.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Prepare a work directory, removing it if it exists and creating it fresh.
///
/// # Arguments
/// * `parent_dir` - Parent directory where the work dir should be created
/// * `name` - Name of the work directory (e.g., "VFAgent_2_2_8")
///
/// # Returns
/// Path to the newly created, empty work directory
pub fn prepare_work_dir(parent_dir: &Path, name: &str) -> Result<PathBuf> {
    let work_dir = parent_dir.join(name);

    if work_dir.exists() {
        fs::remove_dir_all(&work_dir)
            .with_context(|| format!("Failed to remove existing {}", work_dir.display()))?;
        println!("  Deleted existing folder: {}", work_dir.display());
    }

    fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    Ok(work_dir)
}
