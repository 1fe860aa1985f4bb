//! Privileged installer: validate, verify, install with rollback.
//!
//! [`run`] is the single place where every failure kind ends up, so the
//! binary only has to render [`InstallerFailure::messages`] and exit.

pub mod input;
pub mod layout;
pub mod sequence;
pub mod supervisor;
pub mod update;
pub mod verify;

use thiserror::Error;

pub use input::{
    is_root, normalize_go_flags, InstallArgs, InstallOptions, UpdateDescriptor, ValidationErrors,
};
pub use layout::InstallLayout;
pub use sequence::{bundled_runtime, InstallError, InstallStep, Installer};
pub use supervisor::{Launchctl, ServiceSupervisor, Systemctl, SupervisorKind};
pub use verify::{classify_status, Verifier, VerifyError};

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed,
    /// Update mode: acknowledged, nothing changed.
    UpdateAcknowledged,
}

/// Every way a run can fail, in the order the checks happen.
#[derive(Debug, Error)]
pub enum InstallerFailure {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Verify(#[from] VerifyError),

    #[error("{0}")]
    Install(#[from] InstallError),
}

impl InstallerFailure {
    /// Messages for the operator, one per problem.
    pub fn messages(&self) -> Vec<String> {
        match self {
            InstallerFailure::Validation(errors) => errors.0.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Render messages the way the installer reports them.
pub fn render_errors(messages: &[String]) -> String {
    let mut out = String::from("Error(s):\n");
    for message in messages {
        out.push_str(&format!("\t- {}\n", message));
    }
    out
}

/// Run one installer invocation against `layout`.
///
/// Validation and credential verification happen before anything on disk
/// changes. `verifier` builds the verifier for a server address.
pub fn run<V>(
    args: &InstallArgs,
    is_root: bool,
    layout: &InstallLayout,
    supervisor: &dyn ServiceSupervisor,
    verifier: V,
) -> Result<Outcome, InstallerFailure>
where
    V: FnOnce(&str) -> Verifier,
{
    let options = args.validate(is_root)?;

    if options.verify {
        println!("Verifying credentials with {}...", options.server_address);
        verifier(&options.server_address).verify(&options.settings.nu, &options.settings.wp)?;
    }

    if let Some(update) = &options.update {
        update::acknowledge(update);
        return Ok(Outcome::UpdateAcknowledged);
    }

    println!("Installing agent to {}", layout.agent_dir.display());
    Installer::new(layout, supervisor).install(&options.settings)?;
    println!("Agent installed.");
    Ok(Outcome::Installed)
}
