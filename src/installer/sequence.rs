//! The install sequence and its rollback.
//!
//! Steps run strictly in order. Once the previous payload is gone, any
//! failure triggers a single best-effort rollback of everything the sequence
//! may have created, then the original failure is reported.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::layout::InstallLayout;
use super::supervisor::ServiceSupervisor;
use crate::agent_config::{self, AgentConfig, AppSettings, IniDocument};
use crate::common::{
    copy_file_preserving_mode, copy_tree, ensure_parent_exists, remove_dir_if_exists,
    remove_file_if_exists,
};
use crate::platform::Platform;
use crate::process::Cmd;

/// One state of the install sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallStep {
    UnregisterPrevious,
    RemovePreviousPayload,
    CopyPayload,
    LinkRuntime,
    MaterializeConfig,
    InstallServiceDescriptor,
    RegisterAndStart,
}

impl InstallStep {
    pub const ALL: [InstallStep; 7] = [
        InstallStep::UnregisterPrevious,
        InstallStep::RemovePreviousPayload,
        InstallStep::CopyPayload,
        InstallStep::LinkRuntime,
        InstallStep::MaterializeConfig,
        InstallStep::InstallServiceDescriptor,
        InstallStep::RegisterAndStart,
    ];

    /// Whether a failure at this step undoes the install.
    pub fn rolls_back(self) -> bool {
        self >= InstallStep::CopyPayload
    }
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallStep::UnregisterPrevious => "unload the running service",
            InstallStep::RemovePreviousPayload => "remove the previous agent",
            InstallStep::CopyPayload => "copy the agent directory",
            InstallStep::LinkRuntime => "create the runtime symlink",
            InstallStep::MaterializeConfig => "create the agent config",
            InstallStep::InstallServiceDescriptor => "copy the service descriptor to the system directory",
            InstallStep::RegisterAndStart => "load the service descriptor",
        })
    }
}

#[derive(Debug, Error)]
pub enum InstallError {
    /// The payload to install is not where the installer expects it.
    #[error("Missing agent payload at {}", .0.display())]
    MissingPayload(PathBuf),

    #[error("Failed to {step}: {detail}")]
    StepFailed { step: InstallStep, detail: String },
}

impl InstallError {
    pub fn step(&self) -> InstallStep {
        match self {
            InstallError::MissingPayload(_) => InstallStep::CopyPayload,
            InstallError::StepFailed { step, .. } => *step,
        }
    }
}

/// Runs the install sequence for one layout.
pub struct Installer<'a> {
    layout: &'a InstallLayout,
    supervisor: &'a dyn ServiceSupervisor,
    installed_on: NaiveDate,
}

impl<'a> Installer<'a> {
    pub fn new(layout: &'a InstallLayout, supervisor: &'a dyn ServiceSupervisor) -> Self {
        Self {
            layout,
            supervisor,
            installed_on: Local::now().date_naive(),
        }
    }

    /// Stamp a fixed install date instead of today.
    pub fn with_install_date(mut self, date: NaiveDate) -> Self {
        self.installed_on = date;
        self
    }

    /// Install the payload with `settings`, rolling back on failure.
    pub fn install(&self, settings: &AppSettings) -> Result<(), InstallError> {
        let result = self.run_steps(settings);

        if let Err(err) = &result {
            tracing::error!(step = ?err.step(), error = %err, "install failed");
            self.log_failure(&err.to_string());
            if err.step().rolls_back() {
                self.rollback();
            }
        }
        result
    }

    fn run_steps(&self, settings: &AppSettings) -> Result<(), InstallError> {
        self.unregister_previous();
        let previous = self.previous_config();

        run_step(InstallStep::RemovePreviousPayload, || {
            if remove_dir_if_exists(&self.layout.agent_dir)? {
                println!("  Removed previous agent at {}", self.layout.agent_dir.display());
            }
            Ok(())
        })?;

        if !self.layout.payload_source.is_dir() {
            return Err(InstallError::MissingPayload(self.layout.payload_source.clone()));
        }
        run_step(InstallStep::CopyPayload, || self.copy_payload())?;
        run_step(InstallStep::LinkRuntime, || self.link_runtime())?;
        run_step(InstallStep::MaterializeConfig, || {
            self.materialize_config(settings, previous)
        })?;
        run_step(InstallStep::InstallServiceDescriptor, || {
            ensure_parent_exists(&self.layout.system_descriptor)?;
            copy_file_preserving_mode(
                &self.layout.descriptor_template,
                &self.layout.system_descriptor,
            )
        })?;
        run_step(InstallStep::RegisterAndStart, || {
            self.supervisor.load(&self.layout.system_descriptor)
        })?;

        println!("  Service loaded via {}", self.supervisor.name());
        Ok(())
    }

    /// Unload a previously registered service. Failure here usually means it
    /// was never loaded, so it is reported and ignored.
    fn unregister_previous(&self) {
        let descriptor = &self.layout.system_descriptor;
        if !descriptor.exists() {
            return;
        }
        if let Err(e) = self.supervisor.unload(descriptor) {
            eprintln!("  [WARN] Failed to unload {}: {:#}", descriptor.display(), e);
        }
    }

    fn copy_payload(&self) -> Result<()> {
        let mut copied = 0usize;
        copy_tree(&self.layout.payload_source, &self.layout.agent_dir, |_, _, _| copied += 1)?;
        println!(
            "  Copied {} entries to {}",
            copied,
            self.layout.agent_dir.display()
        );
        Ok(())
    }

    fn link_runtime(&self) -> Result<()> {
        let target = bundled_runtime(&self.layout.agent_dir)?;
        Cmd::new("ln")
            .arg("-s")
            .arg_path(&target)
            .arg_path(&self.layout.runtime_link)
            .error_msg("Failed to create symlink")
            .run()?;
        Ok(())
    }

    /// The config recorded by the install being replaced, read before its
    /// payload is removed. An unreadable one is reported and skipped.
    fn previous_config(&self) -> Option<IniDocument> {
        let path = &self.layout.config_path;
        match agent_config::read_existing(path) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("  [WARN] Ignoring previous agent config: {:#}", e);
                None
            }
        }
    }

    /// Metadata from the previous install wins; the payload's own config is
    /// used only when there was none.
    fn materialize_config(&self, settings: &AppSettings, previous: Option<IniDocument>) -> Result<()> {
        let path = &self.layout.config_path;
        let prior = match previous {
            Some(doc) => Some(doc),
            None => agent_config::read_existing(path)?,
        };
        if prior.is_none() {
            eprintln!("  [WARN] No agent config in the payload, writing defaults");
        }

        AgentConfig::materialize(settings.clone(), prior.as_ref(), self.installed_on).write(path)
    }

    /// Undo whatever the sequence may have created. Every failure is
    /// reported and swallowed.
    pub fn rollback(&self) {
        println!("Rolling back...");
        let descriptor = &self.layout.system_descriptor;

        if let Err(e) = self.supervisor.unload(descriptor) {
            tracing::debug!(error = %format!("{:#}", e), "rollback unload failed");
        }
        if let Err(e) = remove_dir_if_exists(&self.layout.agent_dir) {
            eprintln!("  [WARN] Rollback: {:#}", e);
        }
        if let Err(e) = remove_file_if_exists(descriptor) {
            eprintln!("  [WARN] Rollback: {:#}", e);
        }
    }

    /// Append `<timestamp> : <message>` to the failure log, best-effort.
    fn log_failure(&self, message: &str) {
        if let Err(e) = append_failure(&self.layout.failure_log, message) {
            tracing::warn!(error = %format!("{:#}", e), "could not write install failure log");
        }
    }
}

fn run_step<F>(step: InstallStep, action: F) -> Result<(), InstallError>
where
    F: FnOnce() -> Result<()>,
{
    tracing::debug!(step = ?step, "install step");
    action().map_err(|e| InstallError::StepFailed {
        step,
        detail: format!("{:#}", e),
    })
}

/// The interpreter bundled in an installed payload.
///
/// A packaged payload carries exactly one runtime bundle.
pub fn bundled_runtime(agent_dir: &Path) -> Result<PathBuf> {
    let found: Vec<PathBuf> = Platform::ALL
        .iter()
        .map(|p| agent_dir.join(p.profile().runtime_exe()))
        .filter(|exe| exe.exists())
        .collect();

    match found.as_slice() {
        [exe] => Ok(exe.clone()),
        [] => bail!("No bundled runtime under {}", agent_dir.join("deps").display()),
        _ => bail!(
            "Multiple bundled runtimes under {}",
            agent_dir.join("deps").display()
        ),
    }
}

fn append_failure(log: &Path, message: &str) -> Result<()> {
    if let Some(parent) = log.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .with_context(|| format!("Failed to open {}", log.display()))?;
    writeln!(
        file,
        "{} : {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        message
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_starts_at_copy() {
        let rolling: Vec<_> = InstallStep::ALL.into_iter().filter(|s| s.rolls_back()).collect();
        assert_eq!(rolling.first(), Some(&InstallStep::CopyPayload));
        assert_eq!(rolling.len(), 5);
    }

    #[test]
    fn test_error_messages() {
        let err = InstallError::StepFailed {
            step: InstallStep::RegisterAndStart,
            detail: "exit code 1".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to load the service descriptor: exit code 1");
        assert_eq!(err.step(), InstallStep::RegisterAndStart);
        assert_eq!(
            InstallError::MissingPayload(PathBuf::from("/media/agent")).to_string(),
            "Missing agent payload at /media/agent"
        );
    }

    #[test]
    fn test_bundled_runtime_detection() {
        let temp = tempfile::TempDir::new().unwrap();
        let agent = temp.path();
        assert!(bundled_runtime(agent).is_err());

        let exe = agent.join(Platform::Rpm.profile().runtime_exe());
        crate::common::write_file_mode(&exe, "", 0o755).unwrap();
        assert_eq!(bundled_runtime(agent).unwrap(), exe);

        let other = agent.join(Platform::Deb.profile().runtime_exe());
        crate::common::write_file_mode(&other, "", 0o755).unwrap();
        assert!(bundled_runtime(agent).is_err());
    }

    #[test]
    fn test_failure_log_appends() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = temp.path().join("opt/TopPatch/agent_install_failure.log");

        append_failure(&log, "first").unwrap();
        append_failure(&log, "second").unwrap();

        let text = fs::read_to_string(&log).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" : first"));
        assert!(lines[1].ends_with(" : second"));
    }
}
