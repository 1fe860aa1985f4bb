//! The host's service supervisor, driven through its command-line tool.

use anyhow::{Context, Result};
use std::path::Path;

use crate::process::Cmd;

/// Service supervisor family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorKind {
    /// macOS launchd, driven with `launchctl`.
    Launchd,
    /// systemd, driven with `systemctl`.
    Systemd,
}

impl SupervisorKind {
    /// The supervisor of the machine this binary was built for.
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            SupervisorKind::Launchd
        } else {
            SupervisorKind::Systemd
        }
    }

    /// Descriptor file name, both in the payload and on the system.
    pub fn descriptor_name(self) -> &'static str {
        match self {
            SupervisorKind::Launchd => "com.toppatch.agent.plist",
            SupervisorKind::Systemd => "tpagentd.service",
        }
    }

    /// Directory holding the descriptor template, relative to the agent payload.
    pub fn template_dir(self) -> &'static str {
        match self {
            SupervisorKind::Launchd => "daemon/mac",
            SupervisorKind::Systemd => "daemon/linux",
        }
    }

    /// Directory the supervisor loads descriptors from, relative to the host root.
    pub fn system_dir(self) -> &'static str {
        match self {
            SupervisorKind::Launchd => "Library/LaunchDaemons",
            SupervisorKind::Systemd => "etc/systemd/system",
        }
    }

    pub fn supervisor(self) -> Box<dyn ServiceSupervisor> {
        match self {
            SupervisorKind::Launchd => Box::new(Launchctl),
            SupervisorKind::Systemd => Box::new(Systemctl),
        }
    }
}

/// Load/unload requests against an installed service descriptor.
pub trait ServiceSupervisor {
    /// Name for logging.
    fn name(&self) -> &str;
    /// Register the descriptor and start the service.
    fn load(&self, descriptor: &Path) -> Result<()>;
    /// Stop the service and unregister the descriptor.
    fn unload(&self, descriptor: &Path) -> Result<()>;
}

pub struct Launchctl;

impl ServiceSupervisor for Launchctl {
    fn name(&self) -> &str {
        "launchctl"
    }

    fn load(&self, descriptor: &Path) -> Result<()> {
        Cmd::new("launchctl")
            .args(["load", "-w"])
            .arg_path(descriptor)
            .error_msg("Failed to load system plist")
            .run()?;
        Ok(())
    }

    fn unload(&self, descriptor: &Path) -> Result<()> {
        Cmd::new("launchctl")
            .arg("unload")
            .arg_path(descriptor)
            .error_msg("Failed to unload system plist")
            .run()?;
        Ok(())
    }
}

pub struct Systemctl;

impl Systemctl {
    fn unit_name(descriptor: &Path) -> Result<String> {
        descriptor
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("{} is not a unit file", descriptor.display()))
    }
}

impl ServiceSupervisor for Systemctl {
    fn name(&self) -> &str {
        "systemctl"
    }

    fn load(&self, descriptor: &Path) -> Result<()> {
        let unit = Self::unit_name(descriptor)?;
        Cmd::new("systemctl")
            .arg("daemon-reload")
            .error_msg("Failed to reload systemd units")
            .run()?;
        Cmd::new("systemctl")
            .args(["enable", "--now", unit.as_str()])
            .error_msg(format!("Failed to start {}", unit))
            .run()?;
        Ok(())
    }

    fn unload(&self, descriptor: &Path) -> Result<()> {
        let unit = Self::unit_name(descriptor)?;
        Cmd::new("systemctl")
            .args(["disable", "--now", unit.as_str()])
            .error_msg(format!("Failed to stop {}", unit))
            .run()?;
        Ok(())
    }
}
