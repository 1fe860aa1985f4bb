//! Preflight checks for a packaging run.
//!
//! Verifies the archiver for the target platform is installed and every
//! source root exists, so a doomed build fails before the package directory
//! is touched. A config template without a version line only warns.

mod types;

use anyhow::{bail, Result};
use std::ffi::OsStr;
use std::fs;

use crate::config::ForgeConfig;
use crate::forge::CONFIG_TEMPLATE;
use crate::platform::{ArchiveKind, Platform};
use crate::process;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// External tool that produces the artifact for `platform`.
pub fn archiver_for(platform: Platform) -> &'static str {
    match platform.profile().archive {
        ArchiveKind::DiskImage => "hdiutil",
        ArchiveKind::Tarball { .. } => "tar",
    }
}

/// Run all preflight checks for one release.
pub fn run_preflight(config: &ForgeConfig, platform: Platform) -> PreflightReport {
    let mut checks = Vec::new();

    checks.push(check_tool(archiver_for(platform), platform));

    for entry in config.source_roots() {
        let name = format!("source {}", entry.display());
        let path = config.source_path(entry);
        if path.exists() {
            checks.push(CheckResult::pass(&name));
        } else {
            checks.push(CheckResult::fail(
                &name,
                &format!("Not found at {}", path.display()),
            ));
        }
    }

    let script = config.source_path(&config.install_script);
    if script.is_file() {
        checks.push(CheckResult::pass_with("install script", &script.display().to_string()));
    } else {
        checks.push(CheckResult::fail(
            "install script",
            &format!("Not found at {}", script.display()),
        ));
    }

    if let Some(check) = check_config_template(config) {
        checks.push(check);
    }

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(config: &ForgeConfig, platform: Platform) -> Result<()> {
    let report = run_preflight(config, platform);

    if !report.all_passed() {
        report.print();
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before building.",
            report.fail_count()
        );
    }

    tracing::debug!(checks = report.checks.len(), "preflight passed");
    Ok(())
}

/// Warn when the config template has no `version =` line to stamp.
fn check_config_template(config: &ForgeConfig) -> Option<CheckResult> {
    let entry = config
        .source_files
        .iter()
        .find(|f| f.file_name() == Some(OsStr::new(CONFIG_TEMPLATE)))?;
    let text = fs::read_to_string(config.source_path(entry)).ok()?;

    let name = "config template version";
    if text.split('\n').any(|line| line.starts_with("version =")) {
        Some(CheckResult::pass(name))
    } else {
        Some(CheckResult::warn(
            name,
            &format!("No 'version =' line in {}, version will not be stamped", entry.display()),
        ))
    }
}

fn check_tool(tool: &str, platform: Platform) -> CheckResult {
    match process::which(tool) {
        Some(path) => CheckResult::pass_with(tool, &path),
        None => CheckResult::fail(
            tool,
            &format!("Not found in PATH. Required to archive {} builds.", platform),
        ),
    }
}
