//! Release descriptor: the validated `<version> <platform>` pair for one build.

use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

use crate::platform::Platform;

/// Prefix of every package directory and artifact name.
pub const PACKAGE_PREFIX: &str = "VFAgent_";

/// A three-component dotted release version such as `2.2.8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(String);

impl Version {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Version with dots replaced by underscores (`2_2_8`).
    pub fn underscored(&self) -> String {
        self.0.replace('.', "_")
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.matches('.').count() != 2 {
            bail!("Please follow the version format \"x.x.x\" (got \"{}\")", s);
        }
        let valid_component =
            |c: &str| !c.is_empty() && !c.chars().any(|ch| ch == '/' || ch.is_whitespace());
        if !s.split('.').all(valid_component) {
            bail!("Please follow the version format \"x.x.x\" (got \"{}\")", s);
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to build: immutable for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub version: Version,
    pub platform: Platform,
}

impl ReleaseDescriptor {
    /// Validate raw CLI input. Nothing touches the filesystem before this succeeds.
    pub fn parse(version: &str, platform: &str) -> Result<Self> {
        Ok(Self {
            version: version.parse()?,
            platform: platform.parse()?,
        })
    }

    /// Name of the staged package directory, e.g. `VFAgent_2_2_8`.
    pub fn package_dir_name(&self) -> String {
        format!("{}{}", PACKAGE_PREFIX, self.version.underscored())
    }
}

impl fmt::Display for ReleaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.platform)
    }
}
