//! Configuration management for the packager.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over the .env file.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Directories copied recursively into the package's agent directory.
pub const DEFAULT_SOURCE_DIRS: &[&str] = &["../bin", "../daemon", "../plugins", "../src", "../deps"];

/// Single files copied into the package's agent directory.
pub const DEFAULT_SOURCE_FILES: &[&str] = &[
    "../agent.py",
    "../watcher_mac.py",
    "../agent.config",
    "agent_utils",
];

/// Installer entry script, shipped again at the package root as `install`.
pub const DEFAULT_INSTALL_SCRIPT: &str = "agent_utils";

/// Packager configuration.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Directory the source roots are resolved against (default: current directory)
    pub source_dir: PathBuf,
    /// Directory receiving the package directory and the artifact (default: current directory)
    pub output_dir: PathBuf,
    /// Installer entry script, relative to `source_dir`
    pub install_script: PathBuf,
    /// Source roots copied recursively, relative to `source_dir`
    pub source_dirs: Vec<PathBuf>,
    /// Single source files, relative to `source_dir`
    pub source_files: Vec<PathBuf>,
}

impl ForgeConfig {
    /// Default configuration rooted at `base_dir`.
    pub fn new(base_dir: &Path) -> Self {
        Self {
            source_dir: base_dir.to_path_buf(),
            output_dir: base_dir.to_path_buf(),
            install_script: PathBuf::from(DEFAULT_INSTALL_SCRIPT),
            source_dirs: DEFAULT_SOURCE_DIRS.iter().map(PathBuf::from).collect(),
            source_files: DEFAULT_SOURCE_FILES.iter().map(PathBuf::from).collect(),
        }
    }

    /// Load configuration from `<base_dir>/.env` and the environment.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let mut vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            let iter = dotenvy::from_path_iter(&env_path)
                .with_context(|| format!("Failed to read {}", env_path.display()))?;
            for item in iter {
                let (key, value) =
                    item.with_context(|| format!("Malformed line in {}", env_path.display()))?;
                vars.insert(key, value);
            }
        }

        // Environment variables override .env file
        vars.extend(std::env::vars());

        Ok(Self::from_vars(base_dir, &vars))
    }

    /// Build configuration from an explicit variable map.
    pub fn from_vars(base_dir: &Path, vars: &HashMap<String, String>) -> Self {
        let resolve = |value: &String| {
            let path = PathBuf::from(value);
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        };

        let mut config = Self::new(base_dir);
        if let Some(dir) = vars.get("FORGE_SOURCE_DIR") {
            config.source_dir = resolve(dir);
        }
        if let Some(dir) = vars.get("FORGE_OUTPUT_DIR") {
            config.output_dir = resolve(dir);
        }
        if let Some(script) = vars.get("FORGE_INSTALL_SCRIPT") {
            config.install_script = PathBuf::from(script);
        }
        config
    }

    /// Absolute location of a source root.
    pub fn source_path(&self, entry: &Path) -> PathBuf {
        self.source_dir.join(entry)
    }

    /// Every source root in copy order: directories first, then single files.
    pub fn source_roots(&self) -> impl Iterator<Item = &PathBuf> {
        self.source_dirs.iter().chain(self.source_files.iter())
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  FORGE_SOURCE_DIR: {}", self.source_dir.display());
        println!("  FORGE_OUTPUT_DIR: {}", self.output_dir.display());
        println!("  FORGE_INSTALL_SCRIPT: {}", self.install_script.display());
        for entry in self.source_roots() {
            let marker = if self.source_path(entry).exists() {
                "FOUND"
            } else {
                "MISSING"
            };
            println!("  source {}: {}", entry.display(), marker);
        }
    }
}
