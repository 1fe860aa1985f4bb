//! Per-platform rewrites of a staged package.
//!
//! Three independent passes keyed by the platform profile: installer shebang,
//! bundled-runtime pruning and config version stamping.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::common::{remove_dir_if_exists, rewrite_preserving_mode};
use crate::platform::Platform;
use crate::release::Version;

/// Replace everything up to and including the first `\n` with `shebang\n`.
///
/// Bytes after the first newline are returned untouched. Content without any
/// newline is a single first line and is replaced entirely.
pub fn replace_first_line(content: &[u8], shebang: &str) -> Vec<u8> {
    let rest = match content.iter().position(|&b| b == b'\n') {
        Some(newline) => &content[newline + 1..],
        None => &[][..],
    };

    let mut out = Vec::with_capacity(shebang.len() + 1 + rest.len());
    out.extend_from_slice(shebang.as_bytes());
    out.push(b'\n');
    out.extend_from_slice(rest);
    out
}

/// Rewrite the installer script's interpreter line for `platform`.
///
/// Returns false without touching the file when the platform ships its
/// interpreter line as-is.
pub fn rewrite_shebang(script: &Path, platform: Platform) -> Result<bool> {
    let profile = platform.profile();
    if !profile.rewrites_shebang {
        return Ok(false);
    }

    let content =
        fs::read(script).with_context(|| format!("Failed to read {}", script.display()))?;
    rewrite_preserving_mode(script, &replace_first_line(&content, profile.shebang))?;
    Ok(true)
}

/// Remove the runtime bundle of every platform except `platform`.
///
/// Returns the bundle directories that were actually present and removed.
pub fn prune_runtimes(agent_dir: &Path, platform: Platform) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for other in Platform::ALL.into_iter().filter(|p| *p != platform) {
        let bundle = agent_dir.join(other.profile().bundle_dir);
        if remove_dir_if_exists(&bundle)? {
            removed.push(bundle);
        }
    }
    Ok(removed)
}

fn version_line() -> &'static Regex {
    static VERSION_LINE: OnceLock<Regex> = OnceLock::new();
    VERSION_LINE.get_or_init(|| Regex::new(r"^version =.*").expect("static regex is valid"))
}

/// Replace every `version = ...` line with `version = <version>`.
///
/// Lines are split on `\n` only, so blank lines, comments, ordering and a
/// trailing newline pass through unchanged. A replaced line keeps its `\r`
/// on CRLF files. Returns the new text and the number of lines replaced.
pub fn stamp_version(text: &str, version: &Version) -> (String, usize) {
    let mut replaced = 0;
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            if version_line().is_match(line) {
                replaced += 1;
                let cr = if line.ends_with('\r') { "\r" } else { "" };
                format!("version = {}{}", version, cr)
            } else {
                line.to_string()
            }
        })
        .collect();
    (lines.join("\n"), replaced)
}

/// Stamp `version` into the config template at `config`, keeping its mode.
pub fn stamp_config_version(config: &Path, version: &Version) -> Result<usize> {
    let text = fs::read_to_string(config)
        .with_context(|| format!("Failed to read {}", config.display()))?;
    let (stamped, replaced) = stamp_version(&text, version);
    rewrite_preserving_mode(config, stamped.as_bytes())?;
    Ok(replaced)
}
