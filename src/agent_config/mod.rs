//! The agent's `agent.config` file: connection settings plus installation metadata.
//!
//! The file has two fixed sections. `appSettings` is rewritten from operator
//! input on every install; `agentInfo` describes the deployed payload and is
//! carried over from whatever config is already at the installed path.

mod ini;

use anyhow::Result;
use chrono::NaiveDate;
use std::path::Path;

use crate::common::write_file_mode;

pub use ini::IniDocument;

/// Section holding connection and operational settings.
pub const APP_SETTINGS_SECTION: &str = "appSettings";
/// Section holding installation metadata.
pub const AGENT_INFO_SECTION: &str = "agentInfo";
/// `installdate` format (`MM/DD/YYYY`).
pub const INSTALL_DATE_FORMAT: &str = "%m/%d/%Y";
/// Config files carry credentials: owner read/write only.
pub const CONFIG_FILE_MODE: u32 = 0o600;

/// Connection and operational settings (`appSettings`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub agentid: String,
    pub serverhostname: String,
    pub serveripaddress: String,
    pub serverport: String,
    pub agentport: String,
    pub starterport: String,
    pub tunnelport: String,
    pub loglevel: String,
    /// Login name used against the server.
    pub nu: String,
    /// Login password used against the server.
    pub wp: String,
    pub customer: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            agentid: String::new(),
            serverhostname: String::new(),
            serveripaddress: String::new(),
            serverport: "443".to_string(),
            agentport: "9003".to_string(),
            starterport: "9005".to_string(),
            tunnelport: "22".to_string(),
            loglevel: "debug".to_string(),
            nu: String::new(),
            wp: String::new(),
            customer: "default".to_string(),
        }
    }
}

impl AppSettings {
    fn pairs(&self) -> [(&'static str, &str); 11] {
        [
            ("agentid", self.agentid.as_str()),
            ("serverhostname", self.serverhostname.as_str()),
            ("serveripaddress", self.serveripaddress.as_str()),
            ("serverport", self.serverport.as_str()),
            ("agentport", self.agentport.as_str()),
            ("starterport", self.starterport.as_str()),
            ("tunnelport", self.tunnelport.as_str()),
            ("loglevel", self.loglevel.as_str()),
            ("nu", self.nu.as_str()),
            ("wp", self.wp.as_str()),
            ("customer", self.customer.as_str()),
        ]
    }
}

/// Installation metadata (`agentInfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub installdate: String,
}

impl AgentInfo {
    /// Metadata recorded in an existing config. Missing keys stay at their defaults.
    pub fn from_document(doc: &IniDocument) -> Self {
        let get = |key: &str| {
            doc.get(AGENT_INFO_SECTION, key)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            name: get("name"),
            version: get("version"),
            description: get("description"),
            installdate: get("installdate"),
        }
    }
}

/// The full two-section config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub app_settings: AppSettings,
    pub agent_info: AgentInfo,
}

impl AgentConfig {
    /// Merge fresh connection settings with metadata from a prior config.
    ///
    /// New settings always win for `appSettings`. `name`, `version` and
    /// `description` come from `prior` when it records them; `installdate`
    /// is always `installed_on`.
    pub fn materialize(
        settings: AppSettings,
        prior: Option<&IniDocument>,
        installed_on: NaiveDate,
    ) -> Self {
        let mut agent_info = prior.map(AgentInfo::from_document).unwrap_or_default();
        agent_info.installdate = installed_on.format(INSTALL_DATE_FORMAT).to_string();

        Self {
            app_settings: settings,
            agent_info,
        }
    }

    pub fn to_document(&self) -> IniDocument {
        let mut doc = IniDocument::new();
        for (key, value) in self.app_settings.pairs() {
            doc.set(APP_SETTINGS_SECTION, key, value);
        }
        let info = &self.agent_info;
        doc.set(AGENT_INFO_SECTION, "name", &info.name);
        doc.set(AGENT_INFO_SECTION, "version", &info.version);
        doc.set(AGENT_INFO_SECTION, "description", &info.description);
        doc.set(AGENT_INFO_SECTION, "installdate", &info.installdate);
        doc
    }

    /// Write the config with owner-only permissions, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_file_mode(path, self.to_document().to_string(), CONFIG_FILE_MODE)?;
        tracing::debug!(path = %path.display(), "wrote agent config");
        Ok(())
    }
}

/// Read the config at `path` if one exists.
pub fn read_existing(path: &Path) -> Result<Option<IniDocument>> {
    if !path.exists() {
        return Ok(None);
    }
    IniDocument::read(path).map(Some)
}
