//! Filesystem locations touched by an install.
//!
//! Everything hangs off a host root (`/` in production) so the whole
//! sequence can run against a scratch directory.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::supervisor::SupervisorKind;
use crate::forge::{AGENT_DIR, CONFIG_TEMPLATE};

/// Vendor directory under the host root.
pub const TOPPATCH_DIR: &str = "opt/TopPatch";
/// Append-only record of install failures, inside the vendor directory.
pub const FAILURE_LOG: &str = "agent_install_failure.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// Payload shipped beside the installer.
    pub payload_source: PathBuf,
    /// `<root>/opt/TopPatch/agent`
    pub agent_dir: PathBuf,
    pub config_path: PathBuf,
    /// Canonical interpreter path the payload expects.
    pub runtime_link: PathBuf,
    /// Descriptor template inside the installed payload.
    pub descriptor_template: PathBuf,
    /// Descriptor location the supervisor loads from.
    pub system_descriptor: PathBuf,
    pub failure_log: PathBuf,
    pub supervisor: SupervisorKind,
}

impl InstallLayout {
    pub fn new(root: &Path, payload_source: &Path, supervisor: SupervisorKind) -> Self {
        let toppatch_dir = root.join(TOPPATCH_DIR);
        let agent_dir = toppatch_dir.join(AGENT_DIR);

        Self {
            payload_source: payload_source.to_path_buf(),
            config_path: agent_dir.join(CONFIG_TEMPLATE),
            runtime_link: agent_dir.join("bin/python"),
            descriptor_template: agent_dir
                .join(supervisor.template_dir())
                .join(supervisor.descriptor_name()),
            system_descriptor: root
                .join(supervisor.system_dir())
                .join(supervisor.descriptor_name()),
            failure_log: toppatch_dir.join(FAILURE_LOG),
            agent_dir,
            supervisor,
        }
    }

    /// Layout for this host, honouring `AGENT_INSTALL_ROOT` and `AGENT_PAYLOAD_DIR`.
    ///
    /// The payload defaults to the `agent` directory beside the installer executable.
    pub fn from_env() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate the installer executable")?;
        let exe_dir = exe
            .parent()
            .with_context(|| format!("{} has no parent directory", exe.display()))?;
        let vars: HashMap<String, String> = std::env::vars().collect();
        Ok(Self::from_vars(exe_dir, &vars, SupervisorKind::host()))
    }

    pub fn from_vars(
        exe_dir: &Path,
        vars: &HashMap<String, String>,
        supervisor: SupervisorKind,
    ) -> Self {
        let root = vars
            .get("AGENT_INSTALL_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));
        let payload = vars
            .get("AGENT_PAYLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| exe_dir.join(AGENT_DIR));
        Self::new(&root, &payload, supervisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_layout_mac() {
        let layout = InstallLayout::new(Path::new("/"), Path::new("/Volumes/VFAgent/agent"), SupervisorKind::Launchd);

        assert_eq!(layout.agent_dir, PathBuf::from("/opt/TopPatch/agent"));
        assert_eq!(layout.config_path, PathBuf::from("/opt/TopPatch/agent/agent.config"));
        assert_eq!(layout.runtime_link, PathBuf::from("/opt/TopPatch/agent/bin/python"));
        assert_eq!(
            layout.descriptor_template,
            PathBuf::from("/opt/TopPatch/agent/daemon/mac/com.toppatch.agent.plist")
        );
        assert_eq!(
            layout.system_descriptor,
            PathBuf::from("/Library/LaunchDaemons/com.toppatch.agent.plist")
        );
        assert_eq!(
            layout.failure_log,
            PathBuf::from("/opt/TopPatch/agent_install_failure.log")
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut vars = HashMap::new();
        vars.insert("AGENT_INSTALL_ROOT".to_string(), "/tmp/host".to_string());

        let layout = InstallLayout::from_vars(Path::new("/media/pkg"), &vars, SupervisorKind::Systemd);

        assert_eq!(layout.payload_source, PathBuf::from("/media/pkg/agent"));
        assert_eq!(layout.agent_dir, PathBuf::from("/tmp/host/opt/TopPatch/agent"));
        assert_eq!(
            layout.system_descriptor,
            PathBuf::from("/tmp/host/etc/systemd/system/tpagentd.service")
        );

        vars.insert("AGENT_PAYLOAD_DIR".to_string(), "/srv/payload".to_string());
        let layout = InstallLayout::from_vars(Path::new("/media/pkg"), &vars, SupervisorKind::Systemd);
        assert_eq!(layout.payload_source, PathBuf::from("/srv/payload"));
    }
}
