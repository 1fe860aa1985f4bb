//! Archival: wrap the staged package directory into the platform's artifact.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::platform::{ArchiveKind, Platform};
use crate::process::Cmd;

/// A finished release artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// File name of the artifact built from `package_dir` for `platform`.
pub fn artifact_name(package_dir: &str, platform: Platform) -> String {
    match platform.profile().archive {
        ArchiveKind::DiskImage => format!("{}.dmg", package_dir),
        ArchiveKind::Tarball { suffix } => format!("{}{}.tar.gz", package_dir, suffix),
    }
}

/// The archiver invocation, run from inside `output_dir` so the archive
/// holds `package_dir` as its single top-level entry.
pub fn archive_command(output_dir: &Path, package_dir: &str, platform: Platform) -> Cmd {
    let name = artifact_name(package_dir, platform);
    let cmd = match platform.profile().archive {
        ArchiveKind::DiskImage => Cmd::new("hdiutil")
            .args(["create", name.as_str(), "-srcfolder", package_dir, "-ov"])
            .error_msg(format!("Failed to create disk image {}", name)),
        ArchiveKind::Tarball { .. } => Cmd::new("tar")
            .args(["-czf", name.as_str(), package_dir])
            .error_msg(format!("Failed to create tarball {}", name)),
    };
    cmd.dir(output_dir)
}

/// Archive `output_dir/<package_dir>` and write a `.sha256` file beside it.
pub fn create_artifact(output_dir: &Path, package_dir: &str, platform: Platform) -> Result<Artifact> {
    let path = output_dir.join(artifact_name(package_dir, platform));
    println!("Creating {}...", path.display());

    archive_command(output_dir, package_dir, platform).run()?;

    let size = fs::metadata(&path)
        .with_context(|| format!("Archiver did not produce {}", path.display()))?
        .len();
    let sha256 = sha256_file(&path)?;
    write_checksum_file(&path, &sha256)?;

    println!("  Artifact size: {:.2} MB", size as f64 / 1024.0 / 1024.0);
    println!("  SHA256: {}", sha256);

    Ok(Artifact { path, size, sha256 })
}

/// Hex SHA256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `<artifact>.sha256` in `sha256sum -c` format.
fn write_checksum_file(artifact: &Path, sha256: &str) -> Result<PathBuf> {
    let file_name = artifact
        .file_name()
        .with_context(|| format!("{} has no file name", artifact.display()))?
        .to_string_lossy();
    let checksum_path = artifact.with_file_name(format!("{}.sha256", file_name));
    fs::write(&checksum_path, format!("{}  {}\n", sha256, file_name))
        .with_context(|| format!("Failed to write {}", checksum_path.display()))?;
    Ok(checksum_path)
}
