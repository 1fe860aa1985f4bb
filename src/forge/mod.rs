//! Packager pipeline: stage, customize and archive one release.
//!
//! The package directory `<output>/VFAgent_<x_y_z>` is deleted and rebuilt on
//! every run. A failure part-way through leaves the partial directory in
//! place; the next run's rebuild removes it.

mod archive;
mod customize;
mod staging;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::{copy_file_preserving_mode, prepare_work_dir};
use crate::config::ForgeConfig;
use crate::preflight;
use crate::release::ReleaseDescriptor;
use crate::timing::Timer;

pub use archive::{archive_command, artifact_name, create_artifact, sha256_file, Artifact};
pub use customize::{
    prune_runtimes, replace_first_line, rewrite_shebang, stamp_config_version, stamp_version,
};
pub use staging::{StagedEntry, StagingTree};

/// Agent payload directory inside the package.
pub const AGENT_DIR: &str = "agent";
/// Installer entry script at the package root.
pub const INSTALL_SCRIPT: &str = "install";
/// Config template inside the agent payload.
pub const CONFIG_TEMPLATE: &str = "agent.config";

/// Where one run left its outputs.
#[derive(Debug)]
pub struct ForgeOutput {
    pub package_dir: PathBuf,
    pub artifact: Artifact,
}

/// Builds release artifacts from one configured source tree.
pub struct Forge {
    config: ForgeConfig,
}

impl Forge {
    pub fn new(config: ForgeConfig) -> Self {
        Self { config }
    }

    /// Build the artifact for `release`.
    pub fn build(&self, release: &ReleaseDescriptor) -> Result<ForgeOutput> {
        println!("=== Forging VFAgent {} ===\n", release);

        let timer = Timer::start("Preflight");
        preflight::run_preflight_or_fail(&self.config, release.platform)?;
        timer.finish();

        let timer = Timer::start("Staging");
        let package_dir = prepare_work_dir(&self.config.output_dir, &release.package_dir_name())?;
        let tree = self.stage(&package_dir)?;
        println!("  Staged {} files into {}", tree.file_count(), package_dir.display());
        timer.finish();

        let timer = Timer::start("Customizing");
        self.customize(&package_dir, release)?;
        timer.finish();

        let timer = Timer::start("Archiving");
        let artifact = create_artifact(
            &self.config.output_dir,
            &release.package_dir_name(),
            release.platform,
        )?;
        timer.finish();

        println!("\n=== Forge complete: {} ===", artifact.path.display());
        Ok(ForgeOutput {
            package_dir,
            artifact,
        })
    }

    fn stage(&self, package_dir: &Path) -> Result<StagingTree> {
        let agent_dir = package_dir.join(AGENT_DIR);
        fs::create_dir(&agent_dir)
            .with_context(|| format!("Failed to create {}", agent_dir.display()))?;

        let mut tree = StagingTree::new(&agent_dir);
        for entry in self.config.source_roots() {
            println!("  Copying {}", entry.display());
            tree.stage(&self.config.source_dir, entry)?;
        }

        let script = self.config.source_path(&self.config.install_script);
        copy_file_preserving_mode(&script, &package_dir.join(INSTALL_SCRIPT))?;
        Ok(tree)
    }

    fn customize(&self, package_dir: &Path, release: &ReleaseDescriptor) -> Result<()> {
        let agent_dir = package_dir.join(AGENT_DIR);

        if rewrite_shebang(&package_dir.join(INSTALL_SCRIPT), release.platform)? {
            println!("  Shebang: {}", release.platform.profile().shebang);
        }

        for bundle in prune_runtimes(&agent_dir, release.platform)? {
            println!("  Removed runtime bundle {}", bundle.display());
        }

        let config = agent_dir.join(CONFIG_TEMPLATE);
        if config.is_file() {
            if stamp_config_version(&config, &release.version)? == 0 {
                eprintln!(
                    "  [WARN] No 'version =' line in {}, version not stamped",
                    config.display()
                );
            }
        } else {
            eprintln!("  [WARN] No config template at {}", config.display());
        }
        Ok(())
    }
}
