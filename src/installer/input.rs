//! Operator input: flag parsing and aggregated validation.
//!
//! Flags are written Go-style with a single dash (`-pw secret`, `-no-verify`).
//! They are normalized to clap long flags before parsing, then validated
//! into an immutable [`InstallOptions`].

use clap::Parser;
use serde::Deserialize;
use std::ffi::OsString;
use std::fmt;

use crate::agent_config::AppSettings;

/// Flags that take a value.
const VALUE_FLAGS: &[&str] = &["u", "pw", "s", "i", "c", "p", "a", "stp", "tp", "l", "update"];
/// Flags that take no value.
const SWITCH_FLAGS: &[&str] = &["no-verify", "help"];

/// Raw installer flags.
#[derive(Parser, Debug, Clone)]
#[command(name = "agent-installer")]
#[command(about = "Install the agent as a system service")]
pub struct InstallArgs {
    /// Username.
    #[arg(long = "u", value_name = "USERNAME", allow_hyphen_values = true)]
    pub username: Option<String>,

    /// Password.
    #[arg(long = "pw", value_name = "PASSWORD", allow_hyphen_values = true)]
    pub password: Option<String>,

    /// Server hostname.
    #[arg(long = "s", value_name = "HOSTNAME")]
    pub server_hostname: Option<String>,

    /// Server IP address.
    #[arg(long = "i", value_name = "IP")]
    pub server_ip: Option<String>,

    /// Customer.
    #[arg(long = "c", default_value = "default")]
    pub customer: String,

    /// Server port.
    #[arg(long = "p", default_value = "443")]
    pub server_port: String,

    /// Agent port.
    #[arg(long = "a", default_value = "9003")]
    pub agent_port: String,

    /// Starter port.
    #[arg(long = "stp", default_value = "9005")]
    pub starter_port: String,

    /// Tunnel port.
    #[arg(long = "tp", default_value = "22")]
    pub tunnel_port: String,

    /// Log level.
    #[arg(long = "l", default_value = "debug")]
    pub log_level: String,

    /// Update the agent instead of installing. JSON object with keys
    /// old_agent_path, operation_id (optional), app_id (optional).
    #[arg(long = "update", value_name = "JSON")]
    pub update: Option<String>,

    /// Skip verifying credentials against the server.
    #[arg(long = "no-verify")]
    pub no_verify: bool,
}

/// Rewrite single-dash long flags (`-pw`) to `--pw` so clap accepts them.
///
/// Values following a value-taking flag are passed through untouched, so a
/// password starting with `-` survives. `-flag=value` is supported.
pub fn normalize_go_flags<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut out = Vec::new();
    let mut expecting_value = false;

    for (index, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if index == 0 || expecting_value {
            expecting_value = false;
            out.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            out.push(arg);
            continue;
        };

        let Some(body) = text
            .strip_prefix("--")
            .or_else(|| text.strip_prefix('-'))
            .filter(|body| !body.is_empty())
        else {
            out.push(arg);
            continue;
        };

        let name = body.split('=').next().unwrap_or_default();
        let has_inline_value = body.contains('=');
        if VALUE_FLAGS.contains(&name) {
            expecting_value = !has_inline_value;
            out.push(format!("--{}", body).into());
        } else if SWITCH_FLAGS.contains(&name) {
            out.push(format!("--{}", body).into());
        } else {
            // Unknown or short (-h): clap reports or handles it as typed.
            out.push(arg);
        }
    }

    out
}

/// Update request, passed as JSON to `-update`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateDescriptor {
    pub old_agent_path: String,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
}

/// Every validation failure found in one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validated installer configuration, built once and passed down.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub settings: AppSettings,
    /// Hostname when given, otherwise the IP address.
    pub server_address: String,
    pub verify: bool,
    pub update: Option<UpdateDescriptor>,
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl InstallArgs {
    /// Check every requirement and report all violations together.
    pub fn validate(&self, is_root: bool) -> Result<InstallOptions, ValidationErrors> {
        let mut errors = Vec::new();

        if !is_root {
            errors.push("Install script must be run with root privileges.".to_string());
        }
        if given(&self.username).is_none() {
            errors.push("Please provide a username to -u.".to_string());
        }
        if given(&self.password).is_none() {
            errors.push("Please provide a password to -pw.".to_string());
        }

        let server_address = given(&self.server_hostname).or(given(&self.server_ip));
        if server_address.is_none() {
            errors.push(
                "Please provide a server hostname to -s or a server ip address to -i.".to_string(),
            );
        }

        let update = match given(&self.update) {
            Some(json) => match serde_json::from_str::<UpdateDescriptor>(json) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    errors.push(format!("Malformed JSON given to -update: {}.", e));
                    None
                }
            },
            None => None,
        };

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        let settings = AppSettings {
            agentid: String::new(),
            serverhostname: self.server_hostname.clone().unwrap_or_default(),
            serveripaddress: self.server_ip.clone().unwrap_or_default(),
            serverport: self.server_port.clone(),
            agentport: self.agent_port.clone(),
            starterport: self.starter_port.clone(),
            tunnelport: self.tunnel_port.clone(),
            loglevel: self.log_level.clone(),
            nu: self.username.clone().unwrap_or_default(),
            wp: self.password.clone().unwrap_or_default(),
            customer: self.customer.clone(),
        };

        Ok(InstallOptions {
            settings,
            server_address: server_address.unwrap_or_default().to_string(),
            verify: !self.no_verify,
            update,
        })
    }
}

/// Whether the process runs with an effective uid of root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
