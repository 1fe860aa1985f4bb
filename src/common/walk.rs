//! Generic recursive directory walk with an explicit visitor.

use anyhow::{Context, Result};
use std::fs::Metadata;
use std::path::Path;
use walkdir::WalkDir;

/// Walk `root` depth-first, calling `visit` for the root itself and every
/// entry below it.
///
/// Directories are visited before their contents and siblings in file name
/// order, so a visitor that creates directories can rely on the parent
/// existing. Symlinks are reported as symlinks, never followed. The walk stops
/// at the first error, whether from reading the tree or from the visitor.
pub fn walk<F>(root: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&Path, &Metadata) -> Result<()>,
{
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read {}", root.display()))?;
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to read metadata: {}", entry.path().display()))?;
        visit(entry.path(), &metadata)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_directories_before_contents() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("plugins");
        fs::create_dir_all(root.join("rv/data")).unwrap();
        fs::write(root.join("rv/data/app.py"), "").unwrap();
        fs::write(root.join("rv/plugin.py"), "").unwrap();

        let mut seen: Vec<PathBuf> = Vec::new();
        walk(&root, |path, _| {
            seen.push(path.strip_prefix(&root).unwrap().to_path_buf());
            Ok(())
        })
        .unwrap();

        let pos = |p: &str| seen.iter().position(|s| s == Path::new(p)).unwrap();
        assert_eq!(seen[0], PathBuf::new());
        assert!(pos("rv") < pos("rv/data"));
        assert!(pos("rv/data") < pos("rv/data/app.py"));
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_single_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("agent.py");
        fs::write(&file, "print 1\n").unwrap();

        let mut count = 0;
        walk(&file, |path, meta| {
            assert_eq!(path, file.as_path());
            assert!(meta.is_file());
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_root_names_path() {
        let err = walk(Path::new("/nonexistent/forge/src"), |_, _| Ok(())).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/forge/src"));
    }

    #[test]
    fn test_visitor_error_stops_walk() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "").unwrap();
        fs::write(temp.path().join("b"), "").unwrap();

        let mut visited = 0;
        let result = walk(temp.path(), |_, _| {
            visited += 1;
            if visited == 2 {
                anyhow::bail!("unwritable destination");
            }
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(visited, 2);
    }
}
