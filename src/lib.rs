//! agent-forge: build per-platform agent release artifacts and install them.
//!
//! The library backs two binaries: `forge`, the build-time packager, and
//! `agent-installer`, the privileged install sequence run on target hosts.

pub mod agent_config;
pub mod common;
pub mod config;
pub mod forge;
pub mod installer;
pub mod logging;
pub mod platform;
pub mod preflight;
pub mod process;
pub mod release;
pub mod timing;
